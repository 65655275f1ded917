pub mod error;
pub mod platform;
pub mod tracing;

pub mod config {
    pub mod env_loader;
    pub mod model;
}

pub mod drive {
    pub mod api;
}

pub mod event {
    pub mod description;
    pub mod model;
    pub mod normalizer;
}

pub mod http {
    pub mod client;
    pub mod retry;
}

pub mod sheets {
    pub mod api;
    pub mod columns;
}

pub mod sync {
    pub mod existing;
    pub mod images;
    pub mod orchestrator;
    pub mod reconcile;
    pub mod summary;
    pub mod tickets;
}

pub mod wix {
    pub mod api;
    pub mod dto;
    pub mod model;
}
