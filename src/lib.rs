//! docscan - document log with camera/upload capture and OCR preprocessing
//!
//! Captures a document image from a camera or an uploaded file, lets the user pick a
//! region, cleans it up for text recognition and routes the recognized text into a
//! document form field.

pub mod capture;
pub mod config;
pub mod scanner;
pub mod storage;
pub mod vision;
