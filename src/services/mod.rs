pub mod access_gate;
pub mod answer_ledger;
pub mod question_bank;
pub mod scoring_service;
pub mod session_service;
