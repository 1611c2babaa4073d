//! Server-rendered verification page for domain-locked downloads.
//!
//! The page is fully self-contained: inline styles, inline script, no
//! external resources. Its script reads `document.referrer`, applies the
//! same matching rule as [`crate::domain_lock::referrer`], and on a match
//! redirects to the gated download endpoint with the embedded single-use
//! token. On a mismatch it shows a denial message and never navigates.

use super::grant_store::DownloadGrant;
use apkhub_core::models::ApkFile;

/// Render the verification page for a locked file and a freshly issued grant.
pub fn render(file: &ApkFile, grant: &DownloadGrant) -> String {
    // serde_json string encoding doubles as JS string-literal escaping, so
    // the embedded values can never break out of the script.
    let js_allowed = js_string(&grant.allowed_domain);
    let js_url = js_string(&format!(
        "/d/{}/download?token={}&t={}",
        file.id,
        grant.token,
        grant.expires_at.timestamp()
    ));
    let html_filename = html_escape(&file.original_filename);
    let html_domain = html_escape(&grant.allowed_domain);

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<meta name="robots" content="noindex">
<title>Verifying download&hellip;</title>
<style>
  body {{ font-family: system-ui, sans-serif; background: #f5f6f8; color: #1f2430;
         display: flex; align-items: center; justify-content: center; min-height: 100vh; margin: 0; }}
  .card {{ background: #fff; border-radius: 10px; box-shadow: 0 2px 12px rgba(0,0,0,.08);
           padding: 2.5rem 3rem; max-width: 26rem; text-align: center; }}
  .filename {{ font-weight: 600; word-break: break-all; }}
  .hidden {{ display: none; }}
  #denied {{ color: #b3261e; }}
  .spinner {{ width: 2rem; height: 2rem; margin: 1rem auto; border: 3px solid #d8dbe2;
              border-top-color: #3b6ef5; border-radius: 50%; animation: spin .8s linear infinite; }}
  @keyframes spin {{ to {{ transform: rotate(360deg); }} }}
</style>
</head>
<body>
<div class="card">
  <p class="filename">{html_filename}</p>
  <div id="checking">
    <div class="spinner"></div>
    <p>Verifying your download&hellip;</p>
  </div>
  <div id="denied" class="hidden">
    <p>This download is only available from <strong>{html_domain}</strong>.</p>
    <p>Please start the download from that site.</p>
  </div>
</div>
<script>
(function () {{
  var allowed = {js_allowed};
  var url = {js_url};
  var host = "";
  try {{
    if (document.referrer) {{
      host = new URL(document.referrer).hostname.toLowerCase();
    }}
  }} catch (e) {{
    host = "";
  }}
  var ok = host !== "" && (
    host === allowed ||
    host === "www." + allowed ||
    host.slice(-(allowed.length + 1)) === "." + allowed
  );
  if (ok) {{
    window.location.replace(url);
  }} else {{
    document.getElementById("checking").classList.add("hidden");
    document.getElementById("denied").classList.remove("hidden");
  }}
}})();
</script>
</body>
</html>
"#
    )
}

fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

fn html_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use apkhub_core::models::{ApkFile, ApkStatus};
    use chrono::Utc;
    use uuid::Uuid;

    fn sample_file() -> ApkFile {
        ApkFile {
            id: Uuid::new_v4(),
            original_filename: "app-release.apk".to_string(),
            content_type: "application/vnd.android.package-archive".to_string(),
            size_bytes: 1024,
            storage_key: "apks/x/app-release.apk".to_string(),
            allowed_domain: Some("example.com".to_string()),
            download_count: 0,
            status: ApkStatus::Active,
            created_at: Utc::now(),
        }
    }

    fn sample_grant(file: &ApkFile) -> DownloadGrant {
        DownloadGrant {
            token: "tok_abc123".to_string(),
            file_id: file.id,
            allowed_domain: "example.com".to_string(),
            expires_at: Utc::now() + chrono::Duration::seconds(60),
        }
    }

    #[test]
    fn test_page_embeds_token_and_domain() {
        let file = sample_file();
        let grant = sample_grant(&file);
        let html = render(&file, &grant);

        assert!(html.contains(&format!(
            "/d/{}/download?token=tok_abc123&t={}",
            file.id,
            grant.expires_at.timestamp()
        )));
        assert!(html.contains("\"example.com\""));
        assert!(html.contains("app-release.apk"));
    }

    #[test]
    fn test_page_is_self_contained() {
        let file = sample_file();
        let grant = sample_grant(&file);
        let html = render(&file, &grant);

        assert!(!html.contains("src="));
        assert!(!html.contains("href="));
        assert!(html.contains("<script>"));
        assert!(html.contains("<style>"));
    }

    #[test]
    fn test_page_has_denial_branch() {
        let file = sample_file();
        let grant = sample_grant(&file);
        let html = render(&file, &grant);

        assert!(html.contains("only available from"));
        assert!(html.contains("document.referrer"));
    }

    #[test]
    fn test_filename_is_html_escaped() {
        let mut file = sample_file();
        file.original_filename = "<script>alert(1)</script>.apk".to_string();
        let grant = sample_grant(&file);
        let html = render(&file, &grant);

        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_domain_cannot_break_out_of_script() {
        let file = sample_file();
        let mut grant = sample_grant(&file);
        grant.allowed_domain = "example.com\"; evil();//".to_string();
        let html = render(&file, &grant);

        assert!(html.contains(r#"example.com\"; evil();//"#));
    }
}
