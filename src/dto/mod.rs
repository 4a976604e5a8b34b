pub mod session_dto;
