// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction. Parses arguments with
// clap and hands each subcommand to its use case in Layer 2.
// Results are printed here and nowhere else.
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{BinArgs, Commands, CrossfoldArgs, ExtractArgs};

#[derive(Parser, Debug)]
#[command(
    name = "sitefold",
    version,
    about = "Site-preserved cross-validation folds with balanced categories."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Crossfolds(args)   => run_crossfolds(args),
            Commands::BinFeatures(args)  => run_bin_features(args),
            Commands::ExtractFolds(args) => run_extract_folds(args),
        }
    }
}

fn run_crossfolds(args: CrossfoldArgs) -> Result<()> {
    use crate::application::crossfold_use_case::CrossfoldUseCase;

    let output = args.output_csv.clone();
    let report = CrossfoldUseCase::new(args.into()).execute()?;

    println!("{}", report.summary);
    println!("Wrote {} rows to {}", report.rows, output.display());
    Ok(())
}

fn run_bin_features(args: BinArgs) -> Result<()> {
    use crate::application::bin_use_case::BinFeaturesUseCase;

    let written = BinFeaturesUseCase::new(args.into()).execute()?;
    for path in written {
        println!("Processed data saved to {}", path.display());
    }
    Ok(())
}

fn run_extract_folds(args: ExtractArgs) -> Result<()> {
    use crate::application::export_use_case::ExtractFoldsUseCase;

    let (splits, path) = ExtractFoldsUseCase::new(args.into()).execute()?;
    for s in &splits {
        println!("Fold {}: {} train, {} test", s.fold, s.train.len(), s.test.len());
    }
    println!("Saved fold indices to {}", path.display());
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::crossfold_use_case::CrossfoldConfig;
    use crate::domain::site_rule::SiteRule;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_crossfold_defaults_match_config_defaults() {
        let cli = Cli::parse_from(["sitefold", "crossfolds"]);
        let Commands::Crossfolds(args) = cli.command else {
            panic!("expected crossfolds");
        };
        assert_eq!(CrossfoldConfig::from(args), CrossfoldConfig::default());
    }

    #[test]
    fn test_values_and_site_rule_parse() {
        let cli = Cli::parse_from([
            "sitefold", "crossfolds",
            "--values", "LumA,LumB,Basal",
            "--site-rule", "split:-:1",
            "--randomseed", "7",
        ]);
        let Commands::Crossfolds(args) = cli.command else {
            panic!("expected crossfolds");
        };
        let cfg = CrossfoldConfig::from(args);
        assert_eq!(cfg.values, vec!["LumA", "LumB", "Basal"]);
        assert_eq!(cfg.site, SiteRule::Split { delimiter: "-".into(), index: 1 });
        assert_eq!(cfg.seed, 7);
    }

    #[test]
    fn test_bad_site_rule_is_rejected() {
        let res = Cli::try_parse_from(["sitefold", "crossfolds", "--site-rule", "bogus"]);
        assert!(res.is_err());
    }
}
