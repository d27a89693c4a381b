use crate::config::DigesterConfig;
use crate::error::DigestError;
use crate::reader::{self, ReaderOptions};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use xmldigest_core::{
    Action, DefaultRuleManager, DispatchOptions, Dispatcher, ObjectFactory, ObjectRef,
    RuleManager, TypeRegistry,
};

/// Parses XML documents into object graphs using a registered rule set.
///
/// A `Digester` is configured once and can then parse any number of documents,
/// sequentially or from several threads at the same time. Each parse gets its
/// own dispatcher and context; only the rules and the factory are shared.
#[derive(Debug, Clone)]
pub struct Digester {
    rules: Arc<dyn RuleManager>,
    factory: Arc<dyn ObjectFactory>,
    config: DigesterConfig,
}

impl Default for Digester {
    fn default() -> Self {
        Self::new()
    }
}

impl Digester {
    pub fn new() -> Self {
        Self::with_config(DigesterConfig::default())
    }

    pub fn with_config(config: DigesterConfig) -> Self {
        Self {
            rules: Arc::new(DefaultRuleManager::with_placement(config.mandatory_placement)),
            factory: Arc::new(TypeRegistry::new()),
            config,
        }
    }

    /// Replaces the rule registry, e.g. with a custom `RuleManager` implementation.
    pub fn with_rule_manager(mut self, rules: Arc<dyn RuleManager>) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_factory(mut self, factory: Arc<dyn ObjectFactory>) -> Self {
        self.factory = factory;
        self
    }

    pub fn set_factory(&mut self, factory: Arc<dyn ObjectFactory>) {
        self.factory = factory;
    }

    pub fn config(&self) -> &DigesterConfig {
        &self.config
    }

    pub fn rules(&self) -> &Arc<dyn RuleManager> {
        &self.rules
    }

    /// Mutable access to the registry; fails once it has been shared through a copy or a dispatcher.
    pub fn rules_mut(&mut self) -> Result<&mut dyn RuleManager, DigestError> {
        match Arc::get_mut(&mut self.rules) {
            Some(rules) => Ok(rules),
            None => Err(DigestError::RulesShared),
        }
    }

    pub fn add_namespace(&mut self, prefix: &str, uri: &str) -> Result<&mut Self, DigestError> {
        self.rules_mut()?.add_namespace(prefix, uri);
        Ok(self)
    }

    pub fn add_rule(&mut self, pattern: &str, action: Arc<dyn Action>) -> Result<&mut Self, DigestError> {
        self.rules_mut()?.add_rule(pattern, action)?;
        Ok(self)
    }

    /// Registers several actions for one pattern, preserving their order.
    pub fn add_rules(
        &mut self,
        pattern: &str,
        actions: impl IntoIterator<Item = Arc<dyn Action>>,
    ) -> Result<&mut Self, DigestError> {
        let rules = self.rules_mut()?;
        for action in actions {
            rules.add_rule(pattern, action)?;
        }
        Ok(self)
    }

    pub fn add_fallback_action(&mut self, action: Arc<dyn Action>) -> Result<&mut Self, DigestError> {
        self.rules_mut()?.add_fallback_action(action);
        Ok(self)
    }

    pub fn add_mandatory_action(&mut self, action: Arc<dyn Action>) -> Result<&mut Self, DigestError> {
        self.rules_mut()?.add_mandatory_action(action);
        Ok(self)
    }

    /// An independent digester whose registry can be extended without touching this one.
    pub fn copy(&self) -> Result<Digester, DigestError> {
        Ok(Digester {
            rules: Arc::from(self.rules.copy()?),
            factory: self.factory.clone(),
            config: self.config.clone(),
        })
    }

    /// A dispatcher wired to this digester's rules, for callers driving their own tokenizer.
    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(self.rules.clone())
            .with_factory(self.factory.clone())
            .with_options(DispatchOptions {
                trim_body_text: self.config.trim_body_text,
            })
    }

    /// Parses `xml` and returns the root object, if any action produced one.
    pub fn parse_str(&self, xml: &str) -> Result<Option<ObjectRef>, DigestError> {
        self.parse_reader(xml.as_bytes())
    }

    pub fn parse_reader<R: BufRead>(&self, source: R) -> Result<Option<ObjectRef>, DigestError> {
        let mut dispatcher = self.dispatcher();
        self.run(source, &mut dispatcher)?;
        Ok(dispatcher.take_root())
    }

    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<Option<ObjectRef>, DigestError> {
        let path = path.as_ref();
        log::debug!("Parsing {}", path.display());
        let file = File::open(path)?;
        self.parse_reader(BufReader::new(file))
    }

    /// Parses `xml` with `root` already on the object stack, and returns it.
    pub fn parse_str_with_root(&self, xml: &str, root: ObjectRef) -> Result<ObjectRef, DigestError> {
        let mut dispatcher = self.dispatcher();
        dispatcher.set_root(root.clone());
        self.run(xml.as_bytes(), &mut dispatcher)?;
        Ok(dispatcher.take_root().unwrap_or(root))
    }

    fn run<R: BufRead>(&self, source: R, dispatcher: &mut Dispatcher) -> Result<(), DigestError> {
        let options = ReaderOptions {
            namespace_aware: self.config.namespace_aware,
        };
        reader::drive(source, dispatcher, options)
    }
}
