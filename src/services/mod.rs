pub mod cloudinary;
pub mod library_service;
pub mod media_store;
