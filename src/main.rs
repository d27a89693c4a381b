use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use xmldigest::{Action, Attributes, Context, DigestError, Digester, DigesterConfig, ParseError};

/// Shows which rules fire for each element of an XML document.
#[derive(Parser, Debug)]
#[command(version, name = "xmldigest", arg_required_else_help = true)]
struct Cli {
    /// The document to read.
    file: PathBuf,

    /// Trace elements matching this pattern (repeatable).
    #[arg(short, long = "rule", value_name = "PATTERN")]
    rules: Vec<String>,

    /// Trace elements matching this universal pattern (repeatable).
    #[arg(short, long = "universal", value_name = "PATTERN")]
    universal: Vec<String>,

    /// Trace elements that no pattern matches.
    #[arg(long)]
    fallback: bool,

    /// Trace every element.
    #[arg(long)]
    mandatory: bool,

    /// Namespace binding used by the patterns, as PREFIX=URI (repeatable).
    #[arg(short, long = "namespace", value_name = "PREFIX=URI")]
    namespaces: Vec<String>,

    /// JSON configuration file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

/// Prints every callback it receives, indented by element depth.
struct TraceAction {
    label: String,
}

impl TraceAction {
    fn new(label: impl Into<String>) -> Arc<dyn Action> {
        Arc::new(Self { label: label.into() })
    }

    fn print(&self, ctx: &Context, event: &str) {
        let indent = "  ".repeat(ctx.depth().saturating_sub(1));
        println!("{}[{}] {} {}", indent, self.label, event, ctx.path());
    }
}

impl Action for TraceAction {
    fn begin(&self, ctx: &mut Context, _namespace: &str, _name: &str, attrs: &Attributes) -> Result<(), ParseError> {
        let attrs: Vec<String> = attrs.iter().map(|a| format!("{}={:?}", a.qname, a.value)).collect();
        self.print(ctx, &format!("begin {}", attrs.join(" ")));
        Ok(())
    }

    fn body(&self, ctx: &mut Context, _namespace: &str, _name: &str, text: &str) -> Result<(), ParseError> {
        let text = text.trim();
        if !text.is_empty() {
            self.print(ctx, &format!("body {:?}", text));
        }
        Ok(())
    }

    fn end(&self, ctx: &mut Context, _namespace: &str, _name: &str) -> Result<(), ParseError> {
        self.print(ctx, "end");
        Ok(())
    }

    fn name(&self) -> &str {
        &self.label
    }
}

fn build(cli: &Cli) -> Result<Digester, DigestError> {
    let config = match &cli.config {
        Some(path) => DigesterConfig::from_file(path)?,
        None => DigesterConfig::default(),
    };
    let mut digester = Digester::with_config(config);

    for binding in &cli.namespaces {
        let (prefix, uri) = binding.split_once('=').unwrap_or(("", binding.as_str()));
        digester.add_namespace(prefix, uri)?;
    }
    for pattern in &cli.rules {
        digester.add_rule(pattern, TraceAction::new(pattern.as_str()))?;
    }
    for pattern in &cli.universal {
        let pattern = if pattern.starts_with('!') {
            pattern.clone()
        } else {
            format!("!{}", pattern)
        };
        digester.add_rule(&pattern, TraceAction::new(pattern.as_str()))?;
    }
    if cli.fallback {
        digester.add_fallback_action(TraceAction::new("fallback"))?;
    }
    if cli.mandatory {
        digester.add_mandatory_action(TraceAction::new("mandatory"))?;
    }
    Ok(digester)
}

fn main() -> Result<(), DigestError> {
    env_logger::init();
    let cli = Cli::parse();

    let digester = build(&cli)?;
    log::debug!("Rules: {:?}", digester.rules());
    digester.parse_file(&cli.file)?;
    Ok(())
}
