//! # Dimensionality Reduction
//!
//! Reduces high-dimensional embeddings to a handful of coordinates while preserving
//! as much of their variance as possible, so that memory/content embeddings can be
//! laid out in a force-directed graph.
//!
//! ## Currently Available
//! - **PCA** ([`pca`]): Principal Component Analysis, a linear projection onto the
//!   directions of maximal variance

pub mod pca;
