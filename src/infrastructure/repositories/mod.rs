//! Repository implementations using SeaORM

pub mod location_repository;
pub mod user_repository;

pub use location_repository::SeaOrmLocationRepository;
pub use user_repository::SeaOrmUserRepository;
