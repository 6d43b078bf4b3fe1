pub mod api_response;
pub mod repair_dto;

pub use api_response::ApiResponse;
