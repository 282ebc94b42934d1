//! CLI for generating QA test cases with the Gemini API.
//!
//! # Usage
//!
//! ```bash
//! # Two login specifications under free-tier limits
//! cargo run -p qg-generator --bin qg-generate -- cases
//!
//! # All fourteen login specifications with paid-tier limits
//! cargo run -p qg-generator --bin qg-generate -- cases --extended --limits limits.json
//!
//! # Specifications derived from a user story
//! cargo run -p qg-generator --bin qg-generate -- cases --story story.txt --from-story
//!
//! # Inspect specifications without calling the API
//! cargo run -p qg-generator --bin qg-generate -- specs --extended
//!
//! # Test plan from a user story, with generated cases
//! cargo run -p qg-generator --bin qg-generate -- plan --story story.docx --with-cases
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use qg_core::{
    FixedSource, LoginCatalogue, SpecError, SpecificationSource, StorySource,
    TestCaseSpecification, UserStory,
};
use qg_generator::{
    init_logging, read_document, write_suite, write_test_plan, write_text, FailurePolicy,
    GeminiClient, GenerationPipeline, GeneratorError, LogFormat, LoggingConfig, PromptBuilder,
    RateLimitConfig, SystemClock,
};

/// Generate QA test cases from test-case specifications
#[derive(Parser)]
#[command(name = "qg-generate", version)]
#[command(about = "Generate QA test cases from specifications with a rate-limited LLM pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level or filter directive (overridden by QG_LOG)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one test case per specification
    Cases {
        #[command(flatten)]
        source: SourceArgs,

        /// Feature name used in prompts
        #[arg(long, default_value = "Login")]
        feature: String,

        /// Output file (overwritten)
        #[arg(short, long, default_value = "generated_test_cases.txt")]
        output: PathBuf,

        #[command(flatten)]
        limits: LimitArgs,

        /// Keep completed test cases in the failure report
        #[arg(long)]
        keep_partial: bool,
    },
    /// Generate a broad test suite from a user story in one request
    Story {
        /// User story document (.txt, .md or .docx)
        #[arg(long)]
        story: PathBuf,

        /// Output file (overwritten)
        #[arg(short, long, default_value = "test_cases_from_user_story.txt")]
        output: PathBuf,

        #[command(flatten)]
        limits: LimitArgs,
    },
    /// Print specifications as JSON without calling the API
    Specs {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Write a Markdown test plan for a user story
    Plan {
        /// User story document (.txt, .md or .docx)
        #[arg(long)]
        story: PathBuf,

        /// Output file (overwritten)
        #[arg(short, long, default_value = "test_plan.md")]
        output: PathBuf,

        /// Generate a test case per story-derived specification and include them
        #[arg(long)]
        with_cases: bool,

        /// Feature name used in prompts
        #[arg(long, default_value = "Login")]
        feature: String,

        #[command(flatten)]
        limits: LimitArgs,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// User story document (.txt, .md or .docx)
    #[arg(long)]
    story: Option<PathBuf>,

    /// Derive specifications from the user story
    #[arg(long, requires = "story", conflicts_with = "specs")]
    from_story: bool,

    /// JSON file with an array of specifications
    #[arg(long)]
    specs: Option<PathBuf>,

    /// Use the full login catalogue (edge, browser, security, performance, accessibility)
    #[arg(long, conflicts_with_all = ["specs", "from_story"])]
    extended: bool,
}

#[derive(Args)]
struct LimitArgs {
    /// JSON file with rate limits; missing fields take free-tier defaults
    #[arg(long)]
    limits: Option<PathBuf>,

    /// Requests per window
    #[arg(long)]
    max_per_window: Option<u32>,

    /// Window length in seconds
    #[arg(long)]
    window_secs: Option<u64>,

    /// Pause after each success in seconds
    #[arg(long)]
    delay_secs: Option<u64>,

    /// Total attempts per specification
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Backoff base in seconds
    #[arg(long)]
    backoff_base: Option<u64>,
}

impl LimitArgs {
    fn resolve(&self) -> Result<RateLimitConfig, GeneratorError> {
        let mut limits = match &self.limits {
            Some(path) => RateLimitConfig::from_json_file(path)?,
            None => RateLimitConfig::default(),
        };

        if let Some(n) = self.max_per_window {
            limits.max_requests_per_window = n;
        }
        if let Some(secs) = self.window_secs {
            limits.window_seconds = secs;
        }
        if let Some(secs) = self.delay_secs {
            limits.inter_request_delay_seconds = secs;
        }
        if let Some(n) = self.max_attempts {
            limits.max_retries_per_item = n;
        }
        if let Some(secs) = self.backoff_base {
            limits.backoff_base_seconds = secs;
        }

        limits.validate()?;
        Ok(limits)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env is fine; the key may come from the environment
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let logging = LoggingConfig {
        level: cli.log_level.clone(),
        format: cli.log_format,
        file: cli.log_file.clone(),
    };
    if let Err(e) = init_logging(&logging) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some((index, case_type)) = e.failed_specification() {
                eprintln!(
                    "Generation stopped at specification {} ({}). No output was written.",
                    index + 1,
                    case_type
                );
            }
            eprintln!("Error: {}", e);
            if matches!(e, GeneratorError::Client(_)) {
                eprintln!();
                eprintln!("Make sure GEMINI_API_KEY is set (environment or .env file):");
                eprintln!("  export GEMINI_API_KEY=...");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> Result<(), GeneratorError> {
    match command {
        Commands::Cases {
            source,
            feature,
            output,
            limits,
            keep_partial,
        } => {
            let specs = load_specs(&source)?;
            let limits = limits.resolve()?;
            let policy = if keep_partial {
                FailurePolicy::RetainPartial
            } else {
                FailurePolicy::AllOrNothing
            };
            generate_cases(&specs, &feature, &output, limits, policy).await
        }
        Commands::Story {
            story,
            output,
            limits,
        } => {
            let limits = limits.resolve()?;
            generate_story(&story, &output, limits).await
        }
        Commands::Specs { source } => {
            let specs = load_specs(&source)?;
            println!("{}", serde_json::to_string_pretty(&specs)?);
            Ok(())
        }
        Commands::Plan {
            story,
            output,
            with_cases,
            feature,
            limits,
        } => {
            let limits = limits.resolve()?;
            generate_plan(&story, &output, with_cases, &feature, limits).await
        }
    }
}

fn load_specs(args: &SourceArgs) -> Result<Vec<TestCaseSpecification>, GeneratorError> {
    let specs = if let Some(path) = &args.specs {
        FixedSource::from_json_file(path)?.produce()
    } else if let (true, Some(path)) = (args.from_story, &args.story) {
        story_specs(path, &load_story(path)?)?
    } else if args.extended {
        LoginCatalogue::extended().produce()
    } else {
        LoginCatalogue::core().produce()
    };

    Ok(specs)
}

/// Read and parse a user story that must carry its "As a ..." statement.
fn load_story(path: &Path) -> Result<UserStory, GeneratorError> {
    let story = UserStory::parse(&read_document(path)?);
    if !story.has_statement() {
        return Err(GeneratorError::NoStory);
    }
    tracing::info!(
        role = story.role.as_deref().unwrap_or("-"),
        criteria_count = story.acceptance_criteria.len(),
        scenarios_count = story.scenarios.len(),
        "Parsed user story"
    );
    Ok(story)
}

fn story_specs(
    path: &Path,
    story: &UserStory,
) -> Result<Vec<TestCaseSpecification>, GeneratorError> {
    let specs = StorySource::new(story.clone()).produce();
    if specs.is_empty() {
        return Err(SpecError::Empty(path.display().to_string()).into());
    }
    Ok(specs)
}

async fn generate_cases(
    specs: &[TestCaseSpecification],
    feature: &str,
    output: &Path,
    limits: RateLimitConfig,
    policy: FailurePolicy,
) -> Result<(), GeneratorError> {
    let client = GeminiClient::from_env()?;

    println!("QA Test Case Generator");
    println!("======================");
    println!();
    println!("Model: {}", client.model());
    println!("Specifications: {}", specs.len());
    println!(
        "Limits: {} request(s) per {}s, {} attempt(s) per specification",
        limits.max_requests_per_window, limits.window_seconds, limits.max_retries_per_item
    );
    println!();

    let pipeline = GenerationPipeline::new(client, SystemClock::new(), limits)
        .with_feature(feature)
        .with_policy(policy);

    let suite = match pipeline.run(specs).await {
        Ok(suite) => suite,
        Err(failure) => {
            if let Some(partial) = &failure.partial {
                eprintln!(
                    "Incomplete: {} of {} test cases were generated before the failure.",
                    partial.len(),
                    specs.len()
                );
            }
            return Err(failure.into());
        }
    };

    println!("{}", suite.format_summary());
    write_suite(output, &suite.results)?;
    println!("Test cases written to: {}", output.display());
    Ok(())
}

async fn generate_story(
    story_path: &Path,
    output: &Path,
    limits: RateLimitConfig,
) -> Result<(), GeneratorError> {
    let story = read_document(story_path)?;
    let client = GeminiClient::from_env()?;
    let pipeline = GenerationPipeline::new(client, SystemClock::new(), limits);

    let text = pipeline
        .run_prompt(&PromptBuilder::build_story_prompt(&story))
        .await?;

    write_text(output, &text)?;
    println!("Test cases written to: {}", output.display());
    Ok(())
}

async fn generate_plan(
    story_path: &Path,
    output: &Path,
    with_cases: bool,
    feature: &str,
    limits: RateLimitConfig,
) -> Result<(), GeneratorError> {
    let story = load_story(story_path)?;

    let cases = if with_cases {
        let specs = story_specs(story_path, &story)?;
        let client = GeminiClient::from_env()?;
        let pipeline =
            GenerationPipeline::new(client, SystemClock::new(), limits).with_feature(feature);
        let suite = pipeline.run(&specs).await?;
        println!("{}", suite.format_summary());
        suite.into_results()
    } else {
        Vec::new()
    };

    write_test_plan(output, &story, &cases)?;
    println!("Test plan written to: {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(story: Option<PathBuf>, from_story: bool) -> SourceArgs {
        SourceArgs {
            story,
            from_story,
            specs: None,
            extended: false,
        }
    }

    #[test]
    fn test_story_is_ignored_without_from_story() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "Users should be able to log in.").unwrap();

        let specs = load_specs(&source(Some(path.clone()), false)).unwrap();
        assert_eq!(specs, LoginCatalogue::core().produce());

        assert!(matches!(
            load_specs(&source(Some(path), true)),
            Err(GeneratorError::NoStory)
        ));
    }

    #[test]
    fn test_from_story_derives_specs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("story.md");
        std::fs::write(
            &path,
            "As a shopper, I want to log in, So that I can check out.\nAcceptance Criteria:\n1. Valid login succeeds.\n",
        )
        .unwrap();

        let specs = load_specs(&source(Some(path), true)).unwrap();
        assert!(!specs.is_empty());
        assert_ne!(specs, LoginCatalogue::core().produce());
    }

    #[test]
    fn test_cli_parses_plan() {
        let cli = Cli::try_parse_from(["qg-generate", "plan", "--story", "story.docx", "--with-cases"])
            .unwrap();
        match cli.command {
            Commands::Plan {
                story,
                output,
                with_cases,
                ..
            } => {
                assert_eq!(story, PathBuf::from("story.docx"));
                assert_eq!(output, PathBuf::from("test_plan.md"));
                assert!(with_cases);
            }
            _ => panic!("expected plan"),
        }
    }
}
