pub mod inspection_image;
pub mod product;
pub mod product_request;
pub mod reservation;
pub mod shipment;
pub mod supplier;
pub mod supplier_stock;
pub mod warehouse;
pub mod warehouse_stock;
