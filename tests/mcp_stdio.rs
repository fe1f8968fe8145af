use std::path::{Path, PathBuf};

use karpdocs::{DocumentParser, DocumentStore};
use rmcp::{
    ServiceExt,
    model::CallToolRequestParams,
    transport::{ConfigureCommandExt, TokioChildProcess},
};
use serde_json::json;

fn setup_fixture(data_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let store = DocumentStore::open(&data_dir.join("index"))?;
    let parser = DocumentParser::default();
    for (path, raw) in [
        (
            "docs/concepts/nodepools.md",
            "---\ntitle: NodePools\ndescription: Constraints for nodes\n---\n\
             A NodePool sets constraints on the nodes Karpenter creates.\n",
        ),
        (
            "docs/concepts/disruption.md",
            "---\ntitle: Disruption\n---\nKarpenter consolidates capacity.\n",
        ),
    ] {
        let doc = parser.parse_str(path, raw).into_result()?;
        store.upsert(&doc)?;
    }
    Ok(())
}

fn call(name: &str, args: serde_json::Value) -> CallToolRequestParams {
    let mut params = CallToolRequestParams::new(name.to_string());
    params.arguments = args.as_object().cloned();
    params
}

#[tokio::test]
async fn mcp_stdio_search_and_read() -> Result<(), Box<dyn std::error::Error>>
{
    let tempdir = tempfile::tempdir()?;
    setup_fixture(tempdir.path())?;

    let bin = karpdocs_bin()?;
    let transport = TokioChildProcess::new(
        tokio::process::Command::new(bin).configure(|cmd| {
            cmd.arg("mcp")
                .env("KARPDOCS_DATA_DIR", tempdir.path())
                .env_remove("KARPDOCS_DATABASE");
        }),
    )?;

    let client = ().serve(transport).await?;

    let tools = client.peer().list_all_tools().await?;
    let mut names: Vec<_> = tools.iter().map(|t| t.name.to_string()).collect();
    names.sort();
    assert_eq!(names, vec!["read_documentation", "search_documentation"]);

    let result = client
        .peer()
        .call_tool(call(
            "search_documentation",
            json!({ "query": "nodepool", "section": "docs", "limit": 5 }),
        ))
        .await?;

    let structured = result.structured_content.expect("structured content");
    let results = structured
        .get("results")
        .and_then(|v| v.as_array())
        .expect("results array");
    assert_eq!(results.len(), 1);
    assert_eq!(
        results[0].get("path").and_then(|v| v.as_str()),
        Some("docs/concepts/nodepools.md")
    );

    let read = client
        .peer()
        .call_tool(call(
            "read_documentation",
            json!({ "path": "docs/concepts/nodepools.md" }),
        ))
        .await?;
    assert_eq!(read.is_error, Some(false));
    let structured = read.structured_content.expect("structured content");
    assert_eq!(
        structured.get("title").and_then(|v| v.as_str()),
        Some("NodePools")
    );

    let missing = client
        .peer()
        .call_tool(call(
            "read_documentation",
            json!({ "path": "nonexistent/path.md" }),
        ))
        .await?;
    assert_eq!(missing.is_error, Some(true));

    let invalid = client
        .peer()
        .call_tool(call("search_documentation", json!({ "query": "  " })))
        .await;
    assert!(invalid.is_err());

    client.cancel().await?;
    Ok(())
}

fn karpdocs_bin() -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(bin) = option_env!("CARGO_BIN_EXE_karpdocs") {
        return Ok(PathBuf::from(bin));
    }

    let mut path = std::env::current_exe()?;
    path.pop();
    if path.ends_with("deps") {
        path.pop();
    }
    path.push("karpdocs");

    if cfg!(windows) {
        path.set_extension("exe");
    }

    Ok(path)
}
