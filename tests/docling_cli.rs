#![cfg(unix)]

//! Exercises the `docling` process plumbing with a shell script standing in for the real tool.

use std::path::Path;
use std::time::Duration;

use docparse_gateway::converter::{
    ConversionError, DoclingCli, DocumentConverter, ExportError, PipelineOptions,
};

/// Mimics `docling --output <dir> <source>`: writes `<stem>.md` with the flags it saw and the
/// first line of the source. `FAIL` in the source makes it exit non-zero; `SILENT` makes it
/// succeed without writing output.
const FAKE_DOCLING: &str = r#"
out=""
src=""
flags=""
while [ $# -gt 0 ]; do
  case "$1" in
    --output) out="$2"; shift 2 ;;
    --from|--to|--image-export-mode) flags="$flags $1=$2"; shift 2 ;;
    --*) flags="$flags $1"; shift ;;
    *) src="$1"; shift ;;
  esac
done
if grep -q FAIL "$src"; then
  echo "RuntimeError: pipeline crashed on page 1" >&2
  exit 3
fi
if grep -q SILENT "$src"; then
  exit 0
fi
name=$(basename "$src")
stem="${name%.*}"
{
  echo "flags:$flags"
  head -n 1 "$src"
} > "$out/$stem.md"
"#;

struct Fixture {
    dir: tempfile::TempDir,
    cli: DoclingCli,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let script = dir.path().join("fake-docling.sh");
        std::fs::write(&script, FAKE_DOCLING).expect("write script");
        let scratch = dir.path().join("scratch");
        std::fs::create_dir(&scratch).expect("scratch dir");
        let cli = DoclingCli::new("sh")
            .arg(script.to_string_lossy())
            .with_scratch_dir(&scratch);
        Self { dir, cli }
    }

    fn input(&self, name: &str, content: &str) -> std::path::PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).expect("write input");
        path
    }

    fn scratch_entries(&self) -> usize {
        std::fs::read_dir(self.dir.path().join("scratch"))
            .expect("read scratch")
            .count()
    }
}

#[tokio::test]
async fn pdf_conversion_exports_markdown_with_toggles() {
    let fixture = Fixture::new();
    let source = fixture.input("invoice.pdf", "Invoice 1001\n");
    let options = PipelineOptions::Pdf {
        ocr: true,
        table_structure: true,
    };

    let document = fixture
        .cli
        .convert(&source, &options)
        .await
        .unwrap_or_else(|err| panic!("conversion failed: {err}"));
    let markdown = document.export_to_markdown().expect("markdown");

    assert!(markdown.contains("--from=pdf"));
    assert!(markdown.contains("--ocr"));
    assert!(markdown.contains("--tables"));
    assert!(markdown.contains("--to=md"));
    assert!(markdown.contains("Invoice 1001"));
    assert_eq!(fixture.scratch_entries(), 0, "scratch output removed after conversion");
}

#[tokio::test]
async fn image_conversion_uses_image_pipeline() {
    let fixture = Fixture::new();
    let source = fixture.input("receipt.png", "Receipt\n");

    let document = fixture
        .cli
        .convert(&source, &PipelineOptions::Image)
        .await
        .unwrap_or_else(|err| panic!("conversion failed: {err}"));
    let markdown = document.export_to_markdown().expect("markdown");

    assert!(markdown.contains("--from=image"));
    assert!(!markdown.contains("--ocr"));
}

#[tokio::test]
async fn non_zero_exit_reports_stderr() {
    let fixture = Fixture::new();
    let source = fixture.input("broken.pdf", "FAIL\n");

    let result = fixture.cli.convert(&source, &PipelineOptions::Image).await;
    match result {
        Err(ConversionError::Failed { detail, .. }) => {
            assert!(detail.contains("pipeline crashed"), "detail: {detail}");
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("conversion should fail"),
    }
    assert_eq!(fixture.scratch_entries(), 0);
}

#[tokio::test]
async fn missing_markdown_is_an_export_error() {
    let fixture = Fixture::new();
    let source = fixture.input("blank.pdf", "SILENT\n");

    let document = fixture
        .cli
        .convert(&source, &PipelineOptions::Image)
        .await
        .unwrap_or_else(|err| panic!("conversion failed: {err}"));
    let err = document.export_to_markdown().unwrap_err();
    assert!(matches!(err, ExportError::MissingOutput { ref path } if path.ends_with("blank.md")));
}

#[tokio::test]
async fn input_without_file_name_is_rejected() {
    let fixture = Fixture::new();
    let result = fixture
        .cli
        .convert(Path::new("/"), &PipelineOptions::Image)
        .await;
    assert!(matches!(result, Err(ConversionError::Other(_))));
}

#[tokio::test]
async fn abandoned_conversion_kills_launched_grandchildren() {
    let fixture = Fixture::new();
    let source = fixture.input("slow.pdf", "Slow\n");
    let marker = fixture.dir.path().join("grandchild-finished");
    // A launcher that forks the real work and waits for it, like `uvx docling`.
    let script = format!("(sleep 1; touch '{}') & wait", marker.display());
    let cli = DoclingCli::new("sh")
        .arg("-c")
        .arg(script)
        .with_scratch_dir(fixture.dir.path().join("scratch"));

    let attempt = tokio::time::timeout(
        Duration::from_millis(200),
        cli.convert(&source, &PipelineOptions::Image),
    )
    .await;
    assert!(attempt.is_err(), "conversion should still be running");

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(!marker.exists(), "grandchild survived the abandoned conversion");
    assert_eq!(fixture.scratch_entries(), 0);
}
