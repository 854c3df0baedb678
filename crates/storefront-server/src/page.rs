//! Fixed storefront markup.
//!
//! Every successful page begins with [`HEADER_MARKUP`] byte for byte. Page
//! logic appends its body after the open `<div class="container">` and the
//! document is closed with [`FOOTER_MARKUP`].

/// Document head and banner. Ends inside an open `<div class="container">`.
pub const HEADER_MARKUP: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>E-Commerce Store</title>
    <style>
        body { font-family: Arial, sans-serif; margin: 0; padding: 0; }
        .header { background: #333; color: white; padding: 1rem; }
        .container { max-width: 1200px; margin: 0 auto; padding: 1rem; }
    </style>
</head>
<body>
    <div class="header">
        <div class="container">
            <h1>E-Commerce Store</h1>
        </div>
    </div>
    <div class="container">
"#;

/// Closes the container opened by [`HEADER_MARKUP`] and the document.
pub const FOOTER_MARKUP: &str = "    </div>\n</body>\n</html>\n";

/// Sole body of the response when the store cannot be reached.
pub const STORE_FAILURE_MESSAGE: &str = "Database connection failed";

/// Assemble a full page around `body`.
pub fn render_page(body: &str) -> String {
    let mut page =
        String::with_capacity(HEADER_MARKUP.len() + body.len() + FOOTER_MARKUP.len());
    page.push_str(HEADER_MARKUP);
    page.push_str(body);
    page.push_str(FOOTER_MARKUP);
    page
}
