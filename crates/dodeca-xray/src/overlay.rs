//! The overlay markup injected into every page

use eyre::{Result, bail};
use html_escape::{encode_double_quoted_attribute, encode_text};

/// Xray version shown in the overlay header
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Path from the page at `page_url` to the absolute path `abs_path`.
///
/// `relative_to_root("/blog/post/", "/_xray")` is `../../_xray`; pages at
/// the root get `./_xray`.
pub fn relative_to_root(page_url: &str, abs_path: &str) -> Result<String> {
    if !page_url.starts_with('/') {
        bail!("page URL must be absolute, got `{page_url}`");
    }
    let Some(rest) = abs_path.strip_prefix('/') else {
        bail!("path must be absolute, got `{abs_path}`");
    };

    let levels = page_url.matches('/').count() - 1;
    let prefix = if levels == 0 {
        "./".to_string()
    } else {
        "../".repeat(levels)
    };
    Ok(format!("{prefix}{rest}"))
}

/// What the overlay shows about one page
#[derive(Debug, Clone)]
pub struct OverlayPage<'a> {
    pub url: &'a str,
    /// Template the page was rendered from
    pub input_path: &'a str,
    /// Absolute URL path of the xray directory, e.g. `/_xray`
    pub xray_dir: &'a str,
    /// Forwarded to the client as `data-loglevel`
    pub log_level: Option<&'a str>,
    /// Generator name, version and run mode, e.g. `dodeca v0.9 (serve)`
    pub generator: &'a str,
    /// Rendered page-data tree
    pub page_html: &'a str,
}

/// Build the overlay markup for a page.
///
/// The overlay lives in a declarative shadow root so site styles can't leak
/// into it. It stays hidden until its stylesheet has loaded.
pub fn render_overlay(page: &OverlayPage<'_>) -> Result<String> {
    let relative = relative_to_root(page.url, page.xray_dir)?;
    let script = format!("{relative}/xray.js");
    let style = format!("{relative}/xray.css");

    let relative = encode_double_quoted_attribute(&relative);
    let script = encode_double_quoted_attribute(&script);
    let style = encode_double_quoted_attribute(&style);
    let log_level = page
        .log_level
        .filter(|level| !level.is_empty())
        .map(|level| format!(r#" data-loglevel="{}""#, encode_double_quoted_attribute(level)))
        .unwrap_or_default();
    let url = encode_text(page.url);
    let input_path = encode_text(page.input_path);
    let generator = encode_text(page.generator);
    let page_html = page.page_html;

    Ok(format!(
        r##"<script src="{script}" type="module"></script>
<div id="xray-plugin" data-relative="{relative}"{log_level} style="display:none;">
	<template shadowrootmode="open">
		<link rel="stylesheet" href="{style}" onload="document.getElementById('xray-plugin').removeAttribute('style');">
		<menu id="xray-tray">
			<li class="xray"><a href="#" title="Xray">Xray</a></li>
			<li class="buildinfo active"><a href="#" title="Build information">Build information</a></li>
			<li class="pagedata active"><a href="#" title="Page data"></a></li>
			<li class="globaldata active"><a href="#" title="Global data">Global data</a></li>
		</menu>
		<div id="xray" class="loading">
			<main>
				<header>
					<h1><span>X</span><span>ray</span> <span>v{VERSION}</span></h1>
				</header>
				<div id="buildinfo" class="active">
					<h2>Build information</h2>
					<div>
						<h3>Page</h3>
						<dl id="page">
							<dt>URL</dt>
							<dd class="string">{url}</dd>
							<dt>Template</dt>
							<dd class="string">{input_path}</dd>
						</dl>
						<h3>Browser</h3>
						<dl id="browser">
							<dt>DOM ready</dt>
							<dd class="dom"></dd>
							<dt>Loaded</dt>
							<dd class="load"></dd>
						</dl>
						<h3>System</h3>
						<dl>
							<dt>Generator</dt>
							<dd class="string">{generator}</dd>
							<dt>Xray</dt>
							<dd class="string">v{VERSION}</dd>
						</dl>
					</div>
				</div>
				<div id="pagedata" class="active">
					<h2>Page data</h2>
					<div>{page_html}</div>
				</div>
				<div id="globaldata" class="active">
					<h2>Global data</h2>
					<div></div>
				</div>
			</main>
		</div>
	</template>
</div>"##
    ))
}
