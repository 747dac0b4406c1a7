//! Startup banner.

use std::path::Path;

use crate::consts::{AUTHOR, HOMEPAGE, REPO, format_bytes};

/// Running configuration, for display only.
pub struct BannerInfo<'a> {
    pub addr: &'a str,
    pub model: &'a str,
    pub api_base: &'a str,
    pub has_api_key: bool,
    pub public_dir: Option<&'a Path>,
    pub max_body_bytes: usize,
}

/// Render the banner. Never includes the key itself.
pub fn render_banner(info: &BannerInfo) -> String {
    let key_status = if info.has_api_key {
        "configured ✓"
    } else {
        "MISSING (every conversion will fail)"
    };
    let static_dir = info
        .public_dir
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "off".to_string());

    format!(
        r#"
   ╔═══════════════════════════════════════╗
   ║        T A I L W I N D   R E L A Y    ║
   ║       css in, utility classes out     ║
   ╚═══════════════════════════════════════╝

   version   {}
   by        {}
   home      {}
   repo      {}
   listen    http://{}
   model     {}
   upstream  {}
   api key   {}
   static    {}
   body max  {}
"#,
        env!("CARGO_PKG_VERSION"),
        AUTHOR,
        HOMEPAGE,
        REPO,
        info.addr,
        info.model,
        info.api_base,
        key_status,
        static_dir,
        format_bytes(info.max_body_bytes),
    )
}

/// Print the startup banner.
pub fn print_banner(info: &BannerInfo) {
    println!("{}", render_banner(info));
}
