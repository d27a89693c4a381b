#![allow(dead_code)]

pub mod fixtures;

use std::sync::{Arc, Mutex};
use xmldigest::{Action, Attributes, Context, ParseError};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A shared, ordered record of callbacks.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: String) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Only the events of one kind, e.g. `"begin"`.
    pub fn of(&self, kind: &str) -> Vec<String> {
        let prefix = format!("{}(", kind);
        self.events()
            .into_iter()
            .filter(|e| e.starts_with(&prefix))
            .collect()
    }

    /// An action that records its callbacks under `tag`.
    pub fn recorder(&self, tag: &str) -> Arc<dyn Action> {
        Arc::new(Recorder {
            tag: tag.to_string(),
            log: self.clone(),
        })
    }
}

/// Records `kind(tag,path[,text])` for every callback.
pub struct Recorder {
    tag: String,
    log: EventLog,
}

impl Action for Recorder {
    fn start_parse(&self, _ctx: &mut Context) -> Result<(), ParseError> {
        self.log.push(format!("start({})", self.tag));
        Ok(())
    }

    fn begin(&self, ctx: &mut Context, _namespace: &str, _name: &str, _attrs: &Attributes) -> Result<(), ParseError> {
        self.log.push(format!("begin({},{})", self.tag, ctx.path()));
        Ok(())
    }

    fn body_segment(&self, ctx: &mut Context, _namespace: &str, _name: &str, text: &str) -> Result<(), ParseError> {
        self.log.push(format!("segment({},{},{})", self.tag, ctx.path(), text));
        Ok(())
    }

    fn body(&self, ctx: &mut Context, _namespace: &str, _name: &str, text: &str) -> Result<(), ParseError> {
        self.log.push(format!("body({},{},{})", self.tag, ctx.path(), text));
        Ok(())
    }

    fn end(&self, ctx: &mut Context, _namespace: &str, _name: &str) -> Result<(), ParseError> {
        self.log.push(format!("end({},{})", self.tag, ctx.path()));
        Ok(())
    }

    fn finish_parse(&self, _ctx: &mut Context) -> Result<(), ParseError> {
        self.log.push(format!("finish({})", self.tag));
        Ok(())
    }

    fn name(&self) -> &str {
        &self.tag
    }
}
