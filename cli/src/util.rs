use serde::Serialize;
use serde_json::json;

pub const EXIT_OK: i32 = 0;
pub const EXIT_CLIENT_ERROR: i32 = 1;
pub const EXIT_SERVER_ERROR: i32 = 2;
pub const EXIT_CONNECTION_ERROR: i32 = 3;
pub const EXIT_USAGE_ERROR: i32 = 4;

/// Where requests go and who they are made for.
#[derive(Debug, Clone, Copy)]
pub struct Target<'a> {
    pub api_url: &'a str,
    pub user_id: Option<&'a str>,
    /// Compact single-line JSON output
    pub raw: bool,
}

pub fn client() -> reqwest::Client {
    reqwest::Client::new()
}

/// Print a structured error on stderr and return `code`.
pub fn print_error(code: i32, error: &str, message: &str, docs_hint: Option<&str>) -> i32 {
    let mut err = json!({
        "error": error,
        "message": message
    });
    if let Some(hint) = docs_hint {
        err["docs_hint"] = json!(hint);
    }
    eprintln!("{}", format_json(&err, false));
    code
}

pub fn usage_error(message: &str, docs_hint: Option<&str>) -> i32 {
    print_error(EXIT_USAGE_ERROR, "usage_error", message, docs_hint)
}

pub fn format_json<T: Serialize>(value: &T, raw: bool) -> String {
    let formatted = if raw {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    };
    formatted.unwrap_or_else(|e| format!("{{\"error\":\"serialization_failed\",\"message\":\"{e}\"}}"))
}

/// Print a locally computed result on stdout.
pub fn print_json<T: Serialize>(value: &T, raw: bool) -> i32 {
    println!("{}", format_json(value, raw));
    EXIT_OK
}

/// Exit code for an HTTP status: 0 for 2xx, 1 for 4xx, 2 otherwise.
pub fn exit_code_for_status(status: u16) -> i32 {
    match status {
        200..=299 => EXIT_OK,
        400..=499 => EXIT_CLIENT_ERROR,
        _ => EXIT_SERVER_ERROR,
    }
}

/// Execute an API request, print the JSON response, return a structured exit code.
///
/// Exit codes: 0=success (2xx), 1=client error (4xx), 2=server error (5xx),
///             3=connection error, 4=usage error
pub async fn api_request(
    target: Target<'_>,
    method: reqwest::Method,
    path: &str,
    body: Option<serde_json::Value>,
    query: &[(&str, String)],
) -> i32 {
    let mut url = match reqwest::Url::parse(&format!("{}{path}", target.api_url)) {
        Ok(url) => url,
        Err(e) => {
            return usage_error(
                &format!("Invalid URL: {}{path}: {e}", target.api_url),
                Some("Check --api-url or TRENER_API_URL."),
            );
        }
    };
    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query {
            pairs.append_pair(key, value);
        }
    }

    let mut req = client().request(method, url);
    if let Some(user_id) = target.user_id {
        req = req.header("x-user-id", user_id);
    }
    if let Some(body) = body {
        req = req.json(&body);
    }

    let resp = match req.send().await {
        Ok(resp) => resp,
        Err(e) => {
            return print_error(
                EXIT_CONNECTION_ERROR,
                "connection_error",
                &e.to_string(),
                Some("Is the API server running? Check TRENER_API_URL."),
            );
        }
    };

    let exit_code = exit_code_for_status(resp.status().as_u16());
    let resp_body: serde_json::Value = match resp.json().await {
        Ok(value) => value,
        Err(e) => json!({"raw_error": format!("Failed to parse response as JSON: {e}")}),
    };

    let formatted = format_json(&resp_body, target.raw);
    if exit_code == EXIT_OK {
        println!("{formatted}");
    } else {
        eprintln!("{formatted}");
    }
    exit_code
}

/// The user id, or a usage error for commands that act on a user's data.
pub fn require_user<'a>(target: &Target<'a>) -> Result<&'a str, i32> {
    target.user_id.ok_or_else(|| {
        usage_error(
            "A user id is required for this command",
            Some("Set --user-id or the TRENER_USER_ID env var."),
        )
    })
}

/// Read text from a file path or stdin (when path is "-").
pub fn read_text(path: &str) -> Result<String, String> {
    if path == "-" {
        std::io::read_to_string(std::io::stdin()).map_err(|e| format!("Failed to read stdin: {e}"))
    } else {
        std::fs::read_to_string(path).map_err(|e| format!("Failed to read file '{path}': {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_exit_codes() {
        assert_eq!(exit_code_for_status(200), EXIT_OK);
        assert_eq!(exit_code_for_status(204), EXIT_OK);
        assert_eq!(exit_code_for_status(401), EXIT_CLIENT_ERROR);
        assert_eq!(exit_code_for_status(429), EXIT_CLIENT_ERROR);
        assert_eq!(exit_code_for_status(503), EXIT_SERVER_ERROR);
    }

    #[test]
    fn raw_output_is_single_line() {
        let value = json!({"reply": "Ок.", "writes": []});
        assert!(!format_json(&value, true).contains('\n'));
        assert!(format_json(&value, false).contains('\n'));
    }

    #[test]
    fn missing_user_is_a_usage_error() {
        let target = Target {
            api_url: "http://localhost:3000",
            user_id: None,
            raw: false,
        };
        assert_eq!(require_user(&target), Err(EXIT_USAGE_ERROR));
    }
}
