//! generate-tests - turn captured `.curl` files into Rust test cases
//!
//! Walks a directory of `.curl` files (curl command plus an optional
//! `# Expected Response:` JSON trailer) and writes a `<stem>_test.rs` for
//! each into the output directory.
//!
//! Usage: `generate-tests [curl_dir] [out_dir]`
//! Defaults: `curl_requests` and `tests/generated`.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;

use godgpt_e2e::curl::generate_test_case;

fn main() -> anyhow::Result<()> {
    // Initialize logging to file
    let file_appender = tracing_appender::rolling::never(".", "generate-tests.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();

    let mut args = std::env::args().skip(1);
    let curl_dir = PathBuf::from(args.next().unwrap_or_else(|| "curl_requests".to_string()));
    let out_dir = PathBuf::from(args.next().unwrap_or_else(|| "tests/generated".to_string()));

    fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;

    let mut generated = 0usize;
    for entry in fs::read_dir(&curl_dir)
        .with_context(|| format!("reading curl directory {}", curl_dir.display()))?
    {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("curl") {
            continue;
        }
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("request.curl")
            .to_string();

        let content = fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;

        let source = match generate_test_case(&name, &content) {
            Ok(source) => source,
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "skipping unparseable curl file");
                eprintln!("skipping {}: {e}", path.display());
                continue;
            }
        };

        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("request");
        let out_path = out_dir.join(format!("{stem}_test.rs"));
        fs::write(&out_path, source)
            .with_context(|| format!("writing {}", out_path.display()))?;
        tracing::info!(from = %path.display(), to = %out_path.display(), "generated test case");
        println!("Generated test case: {}", out_path.display());
        generated += 1;
    }

    println!("{generated} test case(s) generated");
    Ok(())
}
