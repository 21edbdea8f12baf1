//! Unit tests for MNIST parsing and cache helpers.

use super::*;
use crate::DatasetErrorCode;
use flate2::Compression;
use flate2::write::GzEncoder;
use rstest::{fixture, rstest};
use std::cell::Cell;
use std::collections::HashMap;
use std::io::Write;
use tempfile::TempDir;

const TEST_ROWS: usize = 10_000;

struct FakeClient {
    payloads: HashMap<String, Vec<u8>>,
    calls: Cell<usize>,
}

impl FakeClient {
    fn new(payloads: HashMap<String, Vec<u8>>) -> Self {
        Self {
            payloads,
            calls: Cell::new(0),
        }
    }

    fn for_split(config: &MnistConfig, images: Vec<u8>, labels: Vec<u8>) -> Self {
        let split = config.split;
        Self::new(HashMap::from([
            (file_url(config, split.images_file()), images),
            (file_url(config, split.labels_file()), labels),
        ]))
    }
}

impl DownloadClient for FakeClient {
    fn download_bytes(&self, url: &str) -> Result<Vec<u8>, DatasetError> {
        self.calls.set(self.calls.get() + 1);
        self.payloads
            .get(url)
            .cloned()
            .ok_or_else(|| DatasetError::Download {
                url: url.to_owned(),
                message: "missing fake payload".to_owned(),
            })
    }
}

#[fixture]
fn cache() -> TempDir {
    tempfile::tempdir().expect("temp dir must be creatable")
}

fn test_config(cache: &TempDir) -> MnistConfig {
    MnistConfig {
        cache_dir: cache.path().join("mnist"),
        base_url: "https://example.test/mnist/".to_owned(),
        split: MnistSplit::Test,
    }
}

fn digit_labels(count: usize) -> Vec<u8> {
    (0..count)
        .map(|index| u8::try_from(index % 10).expect("digit fits u8"))
        .collect()
}

#[rstest]
fn load_uses_cache_after_first_download(cache: TempDir) {
    let config = test_config(&cache);
    let client = FakeClient::for_split(
        &config,
        gzip_idx_images(TEST_ROWS, 28, 28, 51),
        gzip_idx_labels(&digit_labels(TEST_ROWS)),
    );

    let first = load_mnist_with_client(&config, &client).expect("first load downloads");
    assert_eq!(first.len(), TEST_ROWS);
    assert_eq!(first.dimensions(), MNIST_DIMENSIONS);
    assert_eq!(first.class_count(), MNIST_CLASSES);
    assert_eq!(first.labels().len(), first.features().len() / MNIST_DIMENSIONS);
    assert_eq!(client.calls.get(), 2);

    let second = load_mnist_with_client(&config, &client).expect("second load reuses cache");
    assert_eq!(second, first);
    assert_eq!(client.calls.get(), 2);
}

#[rstest]
#[case::black(0, 0.0)]
#[case::grey(51, 0.2)]
#[case::white(255, 1.0)]
fn pixels_are_scaled_to_unit_interval(cache: TempDir, #[case] fill: u8, #[case] expected: f32) {
    let config = test_config(&cache);
    let client = FakeClient::for_split(
        &config,
        gzip_idx_images(TEST_ROWS, 28, 28, fill),
        gzip_idx_labels(&digit_labels(TEST_ROWS)),
    );
    let dataset = load_mnist_with_client(&config, &client).expect("load succeeds");
    assert!(
        dataset
            .features()
            .iter()
            .all(|value| (value - expected).abs() < 1e-6)
    );
}

#[rstest]
fn rejects_label_count_mismatch(cache: TempDir) {
    let config = test_config(&cache);
    let client = FakeClient::for_split(
        &config,
        gzip_idx_images(TEST_ROWS, 28, 28, 0),
        gzip_idx_labels(&digit_labels(TEST_ROWS - 1)),
    );
    let err = load_mnist_with_client(&config, &client).expect_err("counts differ");
    assert!(matches!(
        err,
        DatasetError::CountMismatch {
            images: TEST_ROWS,
            labels: 9_999
        }
    ));
}

#[rstest]
fn rejects_unexpected_image_shape(cache: TempDir) {
    let config = test_config(&cache);
    let client = FakeClient::for_split(
        &config,
        gzip_idx_images(TEST_ROWS, 14, 14, 0),
        gzip_idx_labels(&digit_labels(TEST_ROWS)),
    );
    let err = load_mnist_with_client(&config, &client).expect_err("shape is wrong");
    assert_eq!(err.code(), DatasetErrorCode::UnexpectedShape);
    assert_eq!(
        err.to_string(),
        "expected 10000x784 images, got 10000x196"
    );
}

#[rstest]
fn rejects_labels_outside_digit_range(cache: TempDir) {
    let config = test_config(&cache);
    let mut labels = digit_labels(TEST_ROWS);
    if let Some(label) = labels.get_mut(5) {
        *label = 12;
    }
    let client = FakeClient::for_split(
        &config,
        gzip_idx_images(TEST_ROWS, 28, 28, 0),
        gzip_idx_labels(&labels),
    );
    let err = load_mnist_with_client(&config, &client).expect_err("label 12 is not a digit");
    assert_eq!(err.code(), DatasetErrorCode::Dataset);
}

#[rstest]
fn failed_download_leaves_no_cache_entry(cache: TempDir) {
    let config = test_config(&cache);
    let client = FakeClient::new(HashMap::new());
    let err = load_mnist_with_client(&config, &client).expect_err("nothing to download");
    assert_eq!(err.code(), DatasetErrorCode::Download);
    assert!(!config.cache_dir.join(MnistSplit::Test.images_file()).exists());
}

#[rstest]
fn stale_part_file_is_replaced(cache: TempDir) {
    let target = cache.path().join("file.gz");
    fs::write(target.with_extension("part"), b"stale").expect("seed part file");
    write_atomic(&target, b"fresh").expect("atomic write succeeds");
    assert_eq!(fs::read(&target).expect("target readable"), b"fresh");
    assert!(!target.with_extension("part").exists());
}

type MutationFn = fn(Vec<u8>) -> Vec<u8>;

fn corrupt_magic(mut decoded: Vec<u8>) -> Vec<u8> {
    if let Some(byte) = decoded.get_mut(3) {
        *byte = 0;
    }
    decoded
}

fn truncate_payload(mut decoded: Vec<u8>) -> Vec<u8> {
    decoded.pop();
    decoded
}

fn truncate_header(mut decoded: Vec<u8>) -> Vec<u8> {
    decoded.truncate(6);
    decoded
}

#[rstest]
#[case::invalid_magic(corrupt_magic, "unexpected IDX magic")]
#[case::truncated_payload(truncate_payload, "payload length mismatch")]
#[case::short_header(truncate_header, "header is shorter than")]
fn image_parser_rejects_invalid_data(#[case] mutate: MutationFn, #[case] expected: &str) {
    let path = Path::new("images");
    let decoded = gunzip(path, &gzip_idx_images(2, 28, 28, 0)).expect("decode succeeds");
    let err = parse_idx_images(path, &gzip_bytes(&mutate(decoded)))
        .expect_err("invalid image payload must fail");
    let DatasetError::InvalidIdxFile { message, .. } = err else {
        panic!("expected InvalidIdxFile, got {err:?}");
    };
    assert!(message.contains(expected), "message was {message}");
}

#[rstest]
#[case::invalid_magic(corrupt_magic, "unexpected IDX magic")]
#[case::truncated_payload(truncate_payload, "payload length mismatch")]
fn label_parser_rejects_invalid_data(#[case] mutate: MutationFn, #[case] expected: &str) {
    let path = Path::new("labels");
    let decoded = gunzip(path, &gzip_idx_labels(&[1, 2, 3])).expect("decode succeeds");
    let err = parse_idx_labels(path, &gzip_bytes(&mutate(decoded)))
        .expect_err("invalid label payload must fail");
    assert!(err.to_string().contains(expected), "error was {err}");
}

#[rstest]
fn rejects_non_gzip_payload() {
    let err = parse_idx_labels(Path::new("plain"), b"not gzip").expect_err("not gzip");
    assert!(err.to_string().contains("gzip decode failure"));
}

#[rstest]
#[case::explicit(Some("/explicit"), Some("/xdg"), Some("/home/u"), "/explicit")]
#[case::xdg(None, Some("/xdg"), Some("/home/u"), "/xdg/mlbench/mnist")]
#[case::home(None, None, Some("/home/u"), "/home/u/.cache/mlbench/mnist")]
#[case::temp(None, None, None, "/tmp/mlbench/mnist")]
fn cache_dir_precedence(
    #[case] explicit: Option<&str>,
    #[case] xdg: Option<&str>,
    #[case] home: Option<&str>,
    #[case] expected: &str,
) {
    let resolved = cache_dir_from(
        explicit.map(PathBuf::from),
        xdg.map(PathBuf::from),
        home.map(PathBuf::from),
        PathBuf::from("/tmp"),
    );
    assert_eq!(resolved, PathBuf::from(expected));
}

#[rstest]
fn file_url_trims_trailing_slash(cache: TempDir) {
    let config = test_config(&cache);
    assert_eq!(
        file_url(&config, "t10k-labels-idx1-ubyte.gz"),
        "https://example.test/mnist/t10k-labels-idx1-ubyte.gz"
    );
}

fn gzip_idx_images(count: usize, rows: usize, cols: usize, fill: u8) -> Vec<u8> {
    let mut raw = Vec::new();
    for value in [IDX_IMAGE_MAGIC, to_u32(count), to_u32(rows), to_u32(cols)] {
        append_u32_be(&mut raw, value);
    }
    raw.resize(raw.len() + count * rows * cols, fill);
    gzip_bytes(&raw)
}

fn gzip_idx_labels(labels: &[u8]) -> Vec<u8> {
    let mut raw = Vec::new();
    append_u32_be(&mut raw, IDX_LABEL_MAGIC);
    append_u32_be(&mut raw, to_u32(labels.len()));
    raw.extend_from_slice(labels);
    gzip_bytes(&raw)
}

fn append_u32_be(buffer: &mut Vec<u8>, value: u32) {
    buffer.extend(
        [24_u32, 16, 8, 0].map(|shift| u8::try_from((value >> shift) & 0xFF).expect("byte fits u8")),
    );
}

fn to_u32(value: usize) -> u32 {
    u32::try_from(value).expect("test sizes fit u32")
}

fn gzip_bytes(raw: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
    encoder
        .write_all(raw)
        .expect("gzip payload writing must succeed in tests");
    encoder
        .finish()
        .expect("gzip payload finalization must succeed in tests")
}
