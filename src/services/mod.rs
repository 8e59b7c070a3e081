// Services module - cart and catalog business logic

pub mod cart_manager;
pub mod catalog_service;

pub use cart_manager::CartManager;
pub use catalog_service::{
    normalize_services, CatalogProvider, CatalogService, HttpCatalogProvider, SERVICES_PATH,
};
