//! Dataset loaders for the mlbench training benchmark.
//!
//! Provides a download-and-cache loader for the MNIST handwritten digit
//! images and a deterministic synthetic generator for offline runs. Both
//! produce an [`mlbench_core::Dataset`].

mod error;
mod mnist;
mod synthetic;

pub use crate::{
    error::{DatasetError, DatasetErrorCode},
    mnist::{
        DownloadClient, MNIST_CLASSES, MNIST_DIMENSIONS, MnistConfig, MnistSplit, UreqClient,
        load_mnist, load_mnist_with_client,
    },
    synthetic::SyntheticConfig,
};
