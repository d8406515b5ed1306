//! # `cv`
//!
//! Batteries-included pure-Rust point cloud registration crate
//!
//! This crate should only be used for documentation/reference and for quickly creating and
//! running a registration sample/routine. It stores everything needed to align point clouds in
//! one place for discoverability. If you are making a production application, import the
//! dependencies from this crate individually so that you don't have an explosive number of
//! dependencies. You can also disable default features on this crate and enable specific
//! features just to get the functionality you want.
//!
//! All of the basic types are included in the root of the crate. Modules store the algorithms,
//! most of which come from optional libraries.
//!
//! ## Modules
//! * [`pointclouds`] - preprocessing filters for point clouds
//! * [`registration`] - aligning a point cloud with another (ICP)
//! * [`knn`] - searching for nearest neighbors in point clouds

pub use cv_core::*;

/// Point cloud preprocessing (sampling, normal estimation)
pub mod pointclouds {
    #[cfg(feature = "cv-pointclouds")]
    pub use cv_pointclouds::*;
}

/// Rigid registration of point clouds
pub mod registration {
    #[cfg(feature = "cv-registration")]
    pub use cv_registration::*;
}

/// Algorithms for performing k-NN searches
pub mod knn {
    /// Re-export of [`rstar`] crate, an R*-tree for exact nearest neighbor searches
    #[cfg(feature = "knn")]
    pub mod rstar {
        pub use rstar::*;
    }

    #[cfg(feature = "cv-registration")]
    pub use cv_registration::{KdTreeMatcher, KdTreeMatcherFactory, Matcher, MatcherFactory};
}
