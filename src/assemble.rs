use crate::escape::{esc_attr, escape_html};

/// Inlined stylesheets, concatenated in field order.
#[derive(Debug, Clone, Default)]
pub struct StyleBundle {
    pub fonts: String,
    pub mono_fonts: String,
    pub icons: String,
    pub user: String,
}

impl StyleBundle {
    fn concat(&self) -> String {
        [&self.fonts, &self.mono_fonts, &self.icons, &self.user]
            .iter()
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.trim_end())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, Default)]
pub struct ArchiveShell {
    pub title: String,
    pub favicon_data_uri: String,
    pub styles: StyleBundle,
    /// Omitted from the document when the math script could not be resolved.
    pub math_script_data_uri: Option<String>,
    pub sparkle_data_uri: String,
    pub user_script: String,
}

fn asset_shim(sparkle_data_uri: &str) -> String {
    let assets = serde_json::json!({ "sparkleIcon": sparkle_data_uri });
    format!("window.ASSETS = {assets};")
}

/// Builds the archive document; `turns` are appended in the given order.
pub fn assemble(shell: &ArchiveShell, turns: &[String]) -> String {
    let math_script = shell
        .math_script_data_uri
        .as_deref()
        .map(|uri| format!("\n<script src=\"{}\"></script>", esc_attr(uri)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title}</title>
<link rel="icon" type="image/svg+xml" href="{favicon}">
<style>
{styles}
</style>
</head>
<body class="dark-theme">
<div id="chat-container">
{turns}
</div>{math_script}
<script>
{shim}
{user_script}
</script>
</body>
</html>
"#,
        title = escape_html(&shell.title),
        favicon = esc_attr(&shell.favicon_data_uri),
        styles = shell.styles.concat(),
        turns = turns.join("\n"),
        shim = asset_shim(&shell.sparkle_data_uri),
        user_script = shell.user_script,
    )
}
