use anyhow::Result;

/// Print the JSON API document, e.g. for client generation.
fn main() -> Result<()> {
    let doc = horizon::api::openapi();
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}
