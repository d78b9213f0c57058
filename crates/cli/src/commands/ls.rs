//! ls command - List objects under a prefix
//!
//! Prints one `<size> <modified> <name>` line per object as pages arrive.

use std::io::Write;

use clap::Args;
use futures::TryStreamExt;
use gscp_core::{
    Config, Error, ObjectInfo, ObjectStore, RemotePath, Result, format_entry, list_prefix,
};
use gscp_gcs::GcsClient;
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// List objects
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Prefix to list (gs://bucket or gs://bucket/prefix)
    pub path: String,
}

#[derive(Debug, Serialize)]
struct LsOutput {
    items: Vec<ObjectInfo>,
}

/// Execute the ls command
pub async fn execute(args: LsArgs, config: &Config, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let prefix = match RemotePath::parse_prefix(&args.path) {
        Ok(p) => p,
        Err(e) => {
            formatter.error(&format!("Invalid path: {e}"));
            return ExitCode::from_error(&e);
        }
    };

    let client = match GcsClient::new(&config.storage).await {
        Ok(c) => c,
        Err(e) => {
            formatter.error(&format!("Failed to create storage client: {e}"));
            return ExitCode::from_error(&e);
        }
    };

    let page_size = Some(config.defaults.page_size).filter(|n| *n > 0);
    let mut stdout = std::io::stdout();
    let listing = render(&client, &prefix, page_size, formatter.is_json(), &mut stdout);

    let result = match config.defaults.timeout() {
        Some(limit) => tokio::time::timeout(limit, listing)
            .await
            .unwrap_or(Err(Error::Timeout(limit))),
        None => listing.await,
    };

    match result {
        Ok(count) => {
            tracing::debug!(prefix = %prefix, count, "Listing complete");
            ExitCode::Success
        }
        Err(e) => {
            formatter.error(&format!("Failed to list {prefix}: {e}"));
            ExitCode::from_error(&e)
        }
    }
}

/// Write the listing for `prefix` to `out`, returning the number of objects
///
/// Human output is written line by line; JSON output is emitted once the
/// listing completes so a failure never leaves half a document behind.
pub async fn render(
    store: &dyn ObjectStore,
    prefix: &RemotePath,
    page_size: Option<i32>,
    json: bool,
    out: &mut impl Write,
) -> Result<usize> {
    let mut entries = std::pin::pin!(list_prefix(store, prefix, page_size));
    let mut items = Vec::new();
    let mut count = 0;

    while let Some(info) = entries.try_next().await? {
        count += 1;
        if json {
            items.push(info);
        } else {
            writeln!(out, "{}", format_entry(&info))?;
        }
    }

    if json {
        serde_json::to_writer_pretty(&mut *out, &LsOutput { items })?;
        writeln!(out)?;
    }
    out.flush()?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use gscp_core::{ListOptions, ListResult, ObjectSink, SourceStream};

    use super::*;

    /// Serves fixed pages keyed by continuation token
    struct PagedStore {
        pages: Vec<Vec<ObjectInfo>>,
        fail_at: Option<usize>,
        requests: Mutex<Vec<Option<String>>>,
    }

    impl PagedStore {
        fn new(pages: Vec<Vec<ObjectInfo>>) -> Self {
            Self {
                pages,
                fail_at: None,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ObjectStore for PagedStore {
        async fn open_read(&self, path: &RemotePath) -> Result<SourceStream> {
            Err(Error::NotFound(path.to_string()))
        }

        async fn open_write(&self, path: &RemotePath) -> Result<Box<dyn ObjectSink>> {
            Err(Error::General(format!("read-only store: {path}")))
        }

        async fn list_objects(
            &self,
            _prefix: &RemotePath,
            options: ListOptions,
        ) -> Result<ListResult> {
            self.requests
                .lock()
                .unwrap()
                .push(options.continuation_token.clone());

            let index = options
                .continuation_token
                .as_deref()
                .map_or(0, |t| t.parse::<usize>().unwrap());
            if self.fail_at == Some(index) {
                return Err(Error::Listing("connection reset".into()));
            }

            let truncated = index + 1 < self.pages.len();
            Ok(ListResult {
                items: self.pages[index].clone(),
                truncated,
                continuation_token: truncated.then(|| (index + 1).to_string()),
            })
        }
    }

    fn object(key: &str, size: u64, secs: Option<i64>) -> ObjectInfo {
        let mut info = ObjectInfo::new(key, size);
        info.last_modified = secs.map(|s| jiff::Timestamp::from_second(s).unwrap());
        info
    }

    fn prefix() -> RemotePath {
        RemotePath::parse_prefix("gs://bucket/logs/").unwrap()
    }

    #[tokio::test]
    async fn test_render_lines_across_pages() {
        let store = PagedStore::new(vec![
            vec![
                object("logs/a.txt", 1536, Some(1_700_000_000)),
                object("logs/b.bin", 1_048_576, Some(1_700_000_060)),
            ],
            vec![object("logs/empty", 0, None)],
        ]);

        let mut out = Vec::new();
        let count = render(&store, &prefix(), Some(2), false, &mut out)
            .await
            .unwrap();

        assert_eq!(count, 3);
        insta::assert_snapshot!(String::from_utf8(out).unwrap().trim_end(), @r"
        1 KiB 2023-11-14T22:13:20Z logs/a.txt
        1 MiB 2023-11-14T22:14:20Z logs/b.bin
        0 B - logs/empty
        ");
        assert_eq!(
            *store.requests.lock().unwrap(),
            vec![None, Some("1".to_string())]
        );
    }

    #[tokio::test]
    async fn test_render_empty_prefix_prints_nothing() {
        let store = PagedStore::new(vec![Vec::new()]);

        let mut out = Vec::new();
        let count = render(&store, &prefix(), None, false, &mut out)
            .await
            .unwrap();

        assert_eq!(count, 0);
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_render_json_collects_items() {
        let store = PagedStore::new(vec![vec![object("logs/a.txt", 1536, Some(1_700_000_000))]]);

        let mut out = Vec::new();
        render(&store, &prefix(), None, true, &mut out)
            .await
            .unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        let items = value["items"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["key"], "logs/a.txt");
        assert_eq!(items[0]["size_bytes"], 1536);
        assert_eq!(items[0]["size_human"], "1 KiB");
    }

    #[tokio::test]
    async fn test_render_surfaces_page_errors() {
        let mut store = PagedStore::new(vec![
            vec![object("logs/a.txt", 1, Some(1_700_000_000))],
            vec![object("logs/b.txt", 2, Some(1_700_000_000))],
        ]);
        store.fail_at = Some(1);

        let mut out = Vec::new();
        let err = render(&store, &prefix(), None, false, &mut out)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Listing(_)));
        assert_eq!(ExitCode::from_error(&err), ExitCode::NetworkError);
        // The first page was already printed
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "1 B 2023-11-14T22:13:20Z logs/a.txt\n"
        );
    }

    #[tokio::test]
    async fn test_malformed_prefix_is_usage_error() {
        let args = LsArgs {
            path: "/local/dir".into(),
        };
        let code = execute(args, &Config::default(), OutputConfig::default()).await;
        assert_eq!(code, ExitCode::UsageError);
    }
}
