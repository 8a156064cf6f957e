//! Debug mode helper for writing OTLP data to JSON lines files

use std::path::Path;
use std::sync::LazyLock;

use chrono::Utc;
use serde::Serialize;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Global mutex to prevent interleaved writes from concurrent requests.
/// Debug mode writes a single file and is for development only.
static WRITE_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

/// Debug entry wrapper with metadata
#[derive(Serialize)]
struct DebugEntry<'a, T: Serialize> {
    timestamp: String,
    span_count: usize,
    data: &'a T,
}

/// Write OTLP data to a JSON lines debug file.
/// This is fire-and-forget - errors are logged but don't fail the request.
pub async fn write_debug<T: Serialize>(
    debug_path: &Path,
    filename: &str,
    span_count: usize,
    data: &T,
) {
    let file_path = debug_path.join(filename);
    let entry = DebugEntry {
        timestamp: Utc::now().to_rfc3339(),
        span_count,
        data,
    };

    let json = match serde_json::to_string(&entry) {
        Ok(j) => j,
        Err(e) => {
            tracing::warn!(error = %e, filename, "Failed to serialize debug entry");
            return;
        }
    };

    let _guard = WRITE_LOCK.lock().await;

    let result = async {
        tokio::fs::create_dir_all(debug_path).await?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)
            .await?;
        file.write_all(json.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok::<_, std::io::Error>(())
    }
    .await;

    if let Err(e) = result {
        tracing::warn!(
            error = %e,
            path = %file_path.display(),
            "Failed to write debug entry"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Sample {
        name: &'static str,
    }

    #[tokio::test]
    async fn test_write_debug_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("debug");

        write_debug(&nested, "out.jsonl", 1, &Sample { name: "a" }).await;
        write_debug(&nested, "out.jsonl", 2, &Sample { name: "b" }).await;

        let content = std::fs::read_to_string(nested.join("out.jsonl")).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["span_count"], 1);
        assert_eq!(lines[0]["data"]["name"], "a");
        assert_eq!(lines[1]["data"]["name"], "b");
        assert!(lines[1]["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_write_debug_unwritable_path_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        std::fs::write(&file, "x").unwrap();

        // Parent is a regular file, so directory creation fails
        write_debug(&file, "out.jsonl", 1, &Sample { name: "a" }).await;
        assert!(!file.join("out.jsonl").exists());
    }
}
