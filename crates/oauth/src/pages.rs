//! HTML bodies served by the redirect listener.

use {askama::Template, tracing::warn};

#[derive(Template)]
#[template(
    ext = "html",
    source = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>mailrun</title></head>
<body style="font-family: system-ui; text-align: center; padding-top: 80px;">
{% if let Some(heading) = heading %}<h2>{{ heading }}</h2>
{% endif %}<p>{{ message }}</p>
</body>
</html>"#
)]
struct Page<'a> {
    heading: Option<&'a str>,
    message: &'a str,
}

fn page(heading: Option<&str>, message: &str) -> String {
    Page { heading, message }.render().unwrap_or_else(|e| {
        warn!(error = %e, "failed to render callback page");
        String::from("mailrun")
    })
}

pub(crate) fn waiting() -> String {
    page(
        None,
        "Waiting for sign-in... Complete auth in the other browser tab.",
    )
}

pub(crate) fn success() -> String {
    page(
        Some("Authorization successful."),
        "You can close this tab and return to the terminal.",
    )
}

pub(crate) fn denied(error: &str, description: Option<&str>) -> String {
    let message = match description {
        Some(description) => format!("Auth failed: {error}. {description}"),
        None => format!("Auth failed: {error}."),
    };
    page(None, &message)
}

pub(crate) fn exchange_failed() -> String {
    page(None, "Error getting token. Check console.")
}

pub(crate) fn closed() -> String {
    page(
        None,
        "This sign-in session has already finished. Re-run the command to start over.",
    )
}
