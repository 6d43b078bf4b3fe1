pub mod repair_repository;

pub use repair_repository::RepairRepository;
