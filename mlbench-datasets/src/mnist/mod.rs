//! MNIST download-and-cache loader.
//!
//! The four gzip IDX files are fetched once into a cache directory and read
//! from there on later runs. Downloads land in a `.part` file that is
//! renamed into place, so an interrupted download never poisons the cache.

use std::{
    env, fmt, fs,
    io::Read,
    path::{Path, PathBuf},
};

use flate2::read::GzDecoder;
use mlbench_core::Dataset;
use tracing::{debug, info, instrument};

use crate::DatasetError;

const IDX_IMAGE_MAGIC: u32 = 2_051;
const IDX_LABEL_MAGIC: u32 = 2_049;
const IMAGE_HEADER_LEN: usize = 16;
const LABEL_HEADER_LEN: usize = 8;
const PIXEL_SCALE: f32 = 255.0;

/// Number of features (28x28) per MNIST image.
pub const MNIST_DIMENSIONS: usize = 784;
/// Number of digit classes.
pub const MNIST_CLASSES: usize = 10;

/// Which half of MNIST to load.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MnistSplit {
    /// The 60 000 training images.
    #[default]
    Train,
    /// The 10 000 test images.
    Test,
}

impl MnistSplit {
    /// Number of images in the split.
    #[must_use]
    pub const fn expected_rows(self) -> usize {
        match self {
            Self::Train => 60_000,
            Self::Test => 10_000,
        }
    }

    /// Lowercase label of the split.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Test => "test",
        }
    }

    const fn images_file(self) -> &'static str {
        match self {
            Self::Train => "train-images-idx3-ubyte.gz",
            Self::Test => "t10k-images-idx3-ubyte.gz",
        }
    }

    const fn labels_file(self) -> &'static str {
        match self {
            Self::Train => "train-labels-idx1-ubyte.gz",
            Self::Test => "t10k-labels-idx1-ubyte.gz",
        }
    }
}

impl fmt::Display for MnistSplit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where MNIST files come from and where they are cached.
#[derive(Clone, Debug)]
pub struct MnistConfig {
    /// Directory holding the compressed IDX files.
    pub cache_dir: PathBuf,
    /// Base URL serving the gzip IDX files.
    pub base_url: String,
    /// Split to load.
    pub split: MnistSplit,
}

impl Default for MnistConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            base_url: "https://storage.googleapis.com/cvdf-datasets/mnist".to_owned(),
            split: MnistSplit::default(),
        }
    }
}

/// Fetches remote files as bytes.
pub trait DownloadClient {
    /// Downloads the body served at `url`.
    ///
    /// # Errors
    /// Returns [`DatasetError::Download`] when the request fails.
    fn download_bytes(&self, url: &str) -> Result<Vec<u8>, DatasetError>;
}

/// [`DownloadClient`] backed by `ureq`.
#[derive(Clone, Copy, Debug, Default)]
pub struct UreqClient;

impl DownloadClient for UreqClient {
    fn download_bytes(&self, url: &str) -> Result<Vec<u8>, DatasetError> {
        let download_error = |error: ureq::Error| DatasetError::Download {
            url: url.to_owned(),
            message: error.to_string(),
        };
        let mut response = ureq::get(url).call().map_err(download_error)?;
        response.body_mut().read_to_vec().map_err(download_error)
    }
}

/// Loads the configured MNIST split over HTTP, using the cache when the
/// files are already present.
///
/// # Errors
/// Returns [`DatasetError`] when downloading, caching, parsing or
/// validating the files fails.
pub fn load_mnist(config: &MnistConfig) -> Result<Dataset, DatasetError> {
    load_mnist_with_client(config, &UreqClient)
}

/// Loads the configured MNIST split through `client`.
///
/// # Errors
/// Returns [`DatasetError`] when downloading, caching, parsing or
/// validating the files fails.
#[instrument(
    name = "datasets.load_mnist",
    err,
    skip(config, client),
    fields(split = %config.split, cache_dir = %config.cache_dir.display()),
)]
pub fn load_mnist_with_client(
    config: &MnistConfig,
    client: &dyn DownloadClient,
) -> Result<Dataset, DatasetError> {
    fs::create_dir_all(&config.cache_dir)?;
    let split = config.split;

    let images_path = config.cache_dir.join(split.images_file());
    let labels_path = config.cache_dir.join(split.labels_file());
    let image_bytes = ensure_cached(&images_path, &file_url(config, split.images_file()), client)?;
    let label_bytes = ensure_cached(&labels_path, &file_url(config, split.labels_file()), client)?;

    let images = parse_idx_images(&images_path, &image_bytes)?;
    let labels = parse_idx_labels(&labels_path, &label_bytes)?;
    if images.count != labels.len() {
        return Err(DatasetError::CountMismatch {
            images: images.count,
            labels: labels.len(),
        });
    }
    if images.count != split.expected_rows() || images.dimensions != MNIST_DIMENSIONS {
        return Err(DatasetError::UnexpectedShape {
            expected_rows: split.expected_rows(),
            expected_dimensions: MNIST_DIMENSIONS,
            rows: images.count,
            dimensions: images.dimensions,
        });
    }

    let dataset = Dataset::from_parts(
        format!("mnist-{split}"),
        normalise(&images.pixels),
        labels,
        images.dimensions,
        MNIST_CLASSES,
    )?;
    info!(rows = dataset.len(), dimensions = dataset.dimensions(), "mnist loaded");
    Ok(dataset)
}

#[expect(
    clippy::float_arithmetic,
    reason = "pixel intensities are scaled into the unit interval"
)]
fn normalise(pixels: &[u8]) -> Vec<f32> {
    pixels
        .iter()
        .map(|pixel| f32::from(*pixel) / PIXEL_SCALE)
        .collect()
}

fn ensure_cached(
    path: &Path,
    url: &str,
    client: &dyn DownloadClient,
) -> Result<Vec<u8>, DatasetError> {
    if path.exists() {
        debug!(path = %path.display(), "using cached file");
        return fs::read(path).map_err(DatasetError::from);
    }

    info!(url, "downloading");
    let payload = client.download_bytes(url)?;
    write_atomic(path, &payload)?;
    Ok(payload)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), DatasetError> {
    let part_path = path.with_extension("part");
    if part_path.exists() {
        fs::remove_file(&part_path)?;
    }
    fs::write(&part_path, bytes)?;
    fs::rename(&part_path, path)?;
    Ok(())
}

fn file_url(config: &MnistConfig, file_name: &str) -> String {
    format!("{}/{}", config.base_url.trim_end_matches('/'), file_name)
}

fn default_cache_dir() -> PathBuf {
    cache_dir_from(
        env::var_os("MLBENCH_MNIST_CACHE_DIR").map(PathBuf::from),
        env::var_os("XDG_CACHE_HOME").map(PathBuf::from),
        env::var_os("HOME").map(PathBuf::from),
        env::temp_dir(),
    )
}

fn cache_dir_from(
    explicit: Option<PathBuf>,
    xdg_cache: Option<PathBuf>,
    home: Option<PathBuf>,
    temp: PathBuf,
) -> PathBuf {
    if let Some(dir) = explicit {
        return dir;
    }
    if let Some(dir) = xdg_cache {
        return dir.join("mlbench").join("mnist");
    }
    if let Some(dir) = home {
        return dir.join(".cache").join("mlbench").join("mnist");
    }
    temp.join("mlbench").join("mnist")
}

#[derive(Debug)]
struct ParsedImages {
    pixels: Vec<u8>,
    count: usize,
    dimensions: usize,
}

fn parse_idx_images(path: &Path, gzipped: &[u8]) -> Result<ParsedImages, DatasetError> {
    let decoded = gunzip(path, gzipped)?;
    let header = IdxHeader::new(path, &decoded, IMAGE_HEADER_LEN, IDX_IMAGE_MAGIC)?;
    let count = header.field(1)?;
    let rows = header.field(2)?;
    let cols = header.field(3)?;
    let dimensions = rows.checked_mul(cols).ok_or(DatasetError::Overflow)?;
    let expected = count.checked_mul(dimensions).ok_or(DatasetError::Overflow)?;
    let payload = header.payload(expected)?;
    Ok(ParsedImages {
        pixels: payload.to_vec(),
        count,
        dimensions,
    })
}

fn parse_idx_labels(path: &Path, gzipped: &[u8]) -> Result<Vec<u8>, DatasetError> {
    let decoded = gunzip(path, gzipped)?;
    let header = IdxHeader::new(path, &decoded, LABEL_HEADER_LEN, IDX_LABEL_MAGIC)?;
    let count = header.field(1)?;
    Ok(header.payload(count)?.to_vec())
}

/// Big-endian IDX header over a decoded file.
struct IdxHeader<'a> {
    path: &'a Path,
    bytes: &'a [u8],
    header_len: usize,
}

impl<'a> IdxHeader<'a> {
    fn new(
        path: &'a Path,
        bytes: &'a [u8],
        header_len: usize,
        magic: u32,
    ) -> Result<Self, DatasetError> {
        if bytes.len() < header_len {
            return Err(invalid_idx(
                path,
                &format!("header is shorter than {header_len} bytes"),
            ));
        }
        let header = Self {
            path,
            bytes,
            header_len,
        };
        let found = header.word(0)?;
        if found != magic {
            return Err(invalid_idx(
                path,
                &format!("unexpected IDX magic {found}, expected {magic}"),
            ));
        }
        Ok(header)
    }

    fn word(&self, index: usize) -> Result<u32, DatasetError> {
        let start = index.checked_mul(4).ok_or(DatasetError::Overflow)?;
        let field = self
            .bytes
            .get(start..start.saturating_add(4))
            .ok_or_else(|| invalid_idx(self.path, &format!("missing header word {index}")))?;
        Ok(field
            .iter()
            .fold(0_u32, |acc, byte| (acc << 8) | u32::from(*byte)))
    }

    fn field(&self, index: usize) -> Result<usize, DatasetError> {
        usize::try_from(self.word(index)?)
            .map_err(|_| invalid_idx(self.path, &format!("header word {index} does not fit usize")))
    }

    fn payload(&self, expected: usize) -> Result<&'a [u8], DatasetError> {
        let payload = self
            .bytes
            .get(self.header_len..)
            .ok_or_else(|| invalid_idx(self.path, "missing payload bytes"))?;
        if payload.len() != expected {
            return Err(invalid_idx(
                self.path,
                &format!(
                    "payload length mismatch: expected {expected}, got {}",
                    payload.len()
                ),
            ));
        }
        Ok(payload)
    }
}

fn gunzip(path: &Path, bytes: &[u8]) -> Result<Vec<u8>, DatasetError> {
    let mut decoded = Vec::new();
    GzDecoder::new(bytes)
        .read_to_end(&mut decoded)
        .map_err(|error| invalid_idx(path, &format!("gzip decode failure: {error}")))?;
    Ok(decoded)
}

fn invalid_idx(path: &Path, message: &str) -> DatasetError {
    DatasetError::InvalidIdxFile {
        path: path.to_path_buf(),
        message: message.to_owned(),
    }
}

#[cfg(test)]
mod tests;
