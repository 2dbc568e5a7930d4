//! Diagnostic echo page

use std::fmt::Write;

use hyper::HeaderMap;

/// Everything the echo page reports about a request. Values are raw;
/// escaping happens at render time.
#[derive(Debug, Clone, Default)]
pub struct RequestReport {
    pub method: String,
    pub protocol: String,
    pub url: String,
    pub transfer_encoding: String,
    pub host: String,
    pub remote_addr: String,
    pub uri: String,
    /// One entry per header name, repeated values joined with ", "
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Escape `&`, `<` and `>`
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}

/// Collapse a header map into one `(name, value)` pair per name, in the
/// order names first appeared.
pub fn collect_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .keys()
        .map(|name| {
            let joined = headers
                .get_all(name)
                .iter()
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                .collect::<Vec<_>>()
                .join(", ");
            (name.as_str().to_string(), joined)
        })
        .collect()
}

pub fn render_echo_page(server_name: &str, report: &RequestReport) -> String {
    let mut header_dump = String::new();
    for (i, (name, value)) in report.headers.iter().enumerate() {
        if i > 0 {
            header_dump.push('\n');
        }
        let _ = write!(
            header_dump,
            "Header: {}, Value: {}",
            escape_html(name),
            escape_html(value)
        );
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <meta http-equiv="X-UA-Compatible" content="IE=Edge">
    <title>Tunnel Connection</title>
    <meta name="viewport" content="width=device-width, initial-scale=1">
  </head>
  <body>
    <h1>Congrats! You created a tunnel!</h1>
    <p>Served by {server_name}</p>
    <section>
      <div>Method: {method}</div>
      <div>Protocol: {protocol}</div>
      <div>Request URL: {url}</div>
      <div>Transfer encoding: {transfer_encoding}</div>
      <div>Host: {host}</div>
      <div>Remote address: {remote_addr}</div>
      <div>Request URI: {uri}</div>
      <pre>{header_dump}</pre>
      <div>Body: {body}</div>
    </section>
  </body>
</html>
"#,
        server_name = escape_html(server_name),
        method = escape_html(&report.method),
        protocol = escape_html(&report.protocol),
        url = escape_html(&report.url),
        transfer_encoding = escape_html(&report.transfer_encoding),
        host = escape_html(&report.host),
        remote_addr = escape_html(&report.remote_addr),
        uri = escape_html(&report.uri),
        header_dump = header_dump,
        body = escape_html(&report.body),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    #[test]
    fn test_escape_only_markup_characters() {
        assert_eq!(escape_html("a&b<c>d\"e'"), "a&amp;b&lt;c&gt;d\"e'");
    }

    #[test]
    fn test_collect_headers_joins_repeats() {
        let mut headers = HeaderMap::new();
        headers.append("x-probe", HeaderValue::from_static("one"));
        headers.append("accept", HeaderValue::from_static("*/*"));
        headers.append("x-probe", HeaderValue::from_static("two"));

        assert_eq!(
            collect_headers(&headers),
            vec![
                ("x-probe".to_string(), "one, two".to_string()),
                ("accept".to_string(), "*/*".to_string()),
            ]
        );
    }

    #[test]
    fn test_body_and_headers_are_escaped() {
        let report = RequestReport {
            method: "POST".to_string(),
            protocol: "HTTP/1.1".to_string(),
            url: "https://localhost/?q=<x>".to_string(),
            headers: vec![("x-evil".to_string(), "<img src=x>".to_string())],
            body: "hello<script>".to_string(),
            ..Default::default()
        };

        let page = render_echo_page("probe", &report);
        assert!(page.contains("<div>Body: hello&lt;script&gt;</div>"));
        assert!(page.contains("Header: x-evil, Value: &lt;img src=x&gt;"));
        assert!(page.contains("Request URL: https://localhost/?q=&lt;x&gt;"));
        assert!(!page.contains("<script>"));
        assert!(!page.contains("<img"));
    }

    #[test]
    fn test_header_lines_are_newline_separated() {
        let report = RequestReport {
            headers: vec![
                ("host".to_string(), "localhost".to_string()),
                ("accept".to_string(), "*/*".to_string()),
            ],
            ..Default::default()
        };
        let page = render_echo_page("probe", &report);
        assert!(page.contains("<pre>Header: host, Value: localhost\nHeader: accept, Value: */*</pre>"));
    }

    #[test]
    fn test_page_names_the_server() {
        let page = render_echo_page("edge<7>", &RequestReport::default());
        assert!(page.contains("<title>Tunnel Connection</title>"));
        assert!(page.contains("<p>Served by edge&lt;7&gt;</p>"));
    }
}
