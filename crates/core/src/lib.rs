//! Oratoria core: the content catalog, practice-session state machine,
//! feedback pipeline and the storage/vendor seams the web service plugs into.

pub mod catalog;
pub mod coach;
pub mod conversation;
pub mod feedback;
pub mod keys;
pub mod llm_client;
pub mod memory;
pub mod periodic;
pub mod practice;
pub mod progress;
pub mod template;
pub mod users;
pub mod voice;

#[cfg(test)]
mod test_http;
