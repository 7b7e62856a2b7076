//! CLI argument parsing with clap.

use clap::Parser;

/// Fashion lookbook generator: composite a model photo with product,
/// clothing, and logo references through an AI image service.
#[derive(Parser, Debug)]
#[command(name = "lookbook", version, about)]
pub struct Cli {
    /// Prompt text. When omitted, one is composed from the inputs and styles.
    #[arg(conflicts_with = "prompt_file")]
    pub prompt: Option<String>,

    /// Path to a file containing the prompt text.
    #[arg(short = 'p', long, conflicts_with = "prompt")]
    pub prompt_file: Option<String>,

    /// Model (subject) photo. Required for generation.
    #[arg(short, long)]
    pub subject: Option<String>,

    /// Product reference image.
    #[arg(long)]
    pub product: Option<String>,

    /// Clothing reference image.
    #[arg(long)]
    pub clothing: Option<String>,

    /// Logo reference image.
    #[arg(long)]
    pub logo: Option<String>,

    /// Style tag; repeat to select several (e.g. "Sang trọng").
    #[arg(long = "style")]
    pub styles: Vec<String>,

    /// Quality tier: 1080p, 2K, 4K, 8K.
    #[arg(short, long)]
    pub quality: Option<String>,

    /// Target aspect ratio: 9:16, 16:9, 1:1.
    #[arg(short, long)]
    pub aspect: Option<String>,

    /// Number of images to request, clamped to 1..=8.
    #[arg(short = 'n', long, allow_negative_numbers = true)]
    pub count: Option<i64>,

    /// Model name or short alias.
    #[arg(short, long)]
    pub model: Option<String>,

    /// Output file path (auto-generated if not specified).
    #[arg(short, long)]
    pub output: Option<String>,

    /// Config file path override.
    #[arg(long)]
    pub config: Option<String>,

    /// Print the prompt that would be composed from the inputs and styles, then exit.
    #[arg(long)]
    pub suggest_prompt: bool,

    /// Verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Resolve the prompt from either the positional argument or the file flag.
    ///
    /// Empty when neither is given.
    ///
    /// # Errors
    ///
    /// Returns an error if the prompt file cannot be read.
    pub fn resolve_prompt(&self) -> Result<String, std::io::Error> {
        if let Some(ref text) = self.prompt {
            Ok(text.clone())
        } else if let Some(ref path) = self.prompt_file {
            std::fs::read_to_string(path)
        } else {
            Ok(String::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_prompt() {
        let cli = Cli::parse_from(["lookbook", "a model in a red dress"]);
        assert_eq!(cli.resolve_prompt().unwrap(), "a model in a red dress");
    }

    #[test]
    fn prompt_file_flag() {
        let dir = std::env::temp_dir().join("lookbook_cli_pf_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("prompt.txt");
        std::fs::write(&path, "prompt from file").unwrap();

        let cli = Cli::parse_from(["lookbook", "-p", path.to_str().unwrap()]);
        assert!(cli.prompt.is_none());
        assert_eq!(cli.resolve_prompt().unwrap(), "prompt from file");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn no_prompt_is_empty() {
        let cli = Cli::parse_from(["lookbook"]);
        assert_eq!(cli.resolve_prompt().unwrap(), "");
        assert!(cli.subject.is_none());
        assert!(cli.styles.is_empty());
        assert!(cli.count.is_none());
        assert!(!cli.suggest_prompt);
        assert!(!cli.verbose);
    }

    #[test]
    fn all_options() {
        let cli = Cli::parse_from([
            "lookbook",
            "-s",
            "model.jpg",
            "--product",
            "bag.png",
            "--clothing",
            "dress.webp",
            "--logo",
            "logo.png",
            "--style",
            "Sang trọng",
            "--style",
            "Hiện đại",
            "-q",
            "4K",
            "-a",
            "16:9",
            "-n",
            "3",
            "-m",
            "gpt-1",
            "-o",
            "out.png",
            "-v",
            "--suggest-prompt",
        ]);
        assert_eq!(cli.subject.as_deref(), Some("model.jpg"));
        assert_eq!(cli.product.as_deref(), Some("bag.png"));
        assert_eq!(cli.clothing.as_deref(), Some("dress.webp"));
        assert_eq!(cli.logo.as_deref(), Some("logo.png"));
        assert_eq!(cli.styles, ["Sang trọng", "Hiện đại"]);
        assert_eq!(cli.quality.as_deref(), Some("4K"));
        assert_eq!(cli.aspect.as_deref(), Some("16:9"));
        assert_eq!(cli.count, Some(3));
        assert_eq!(cli.model.as_deref(), Some("gpt-1"));
        assert_eq!(cli.output.as_deref(), Some("out.png"));
        assert!(cli.verbose);
        assert!(cli.suggest_prompt);
    }

    #[test]
    fn negative_count_parses() {
        let cli = Cli::parse_from(["lookbook", "-n", "-4"]);
        assert_eq!(cli.count, Some(-4));
    }
}
