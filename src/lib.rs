#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod extractor;
pub mod mime;
pub mod models;
pub mod normalize;
pub mod packager;
pub mod payload;
pub mod rewrite;
pub mod runtime;
pub mod tree;

pub use config::BundleConfig;
pub use error::{BundleError, Result};
pub use extractor::Extractor;
pub use mime::{DefaultMimeResolver, MimeResolver, guess_mime};
pub use models::{AssetRecord, FileTree, GlobalContext, Manifest, RemoteResource};
pub use normalize::{AssetKind, AssetNormalizer};
pub use packager::{EntryDocument, PackOptions, Packager, render_document};
pub use runtime::RuntimeAssets;
pub use tree::TreeLoader;
