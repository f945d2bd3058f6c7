use super::*;

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["tradeintel-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn parses_sources_command() {
    let cli = Cli::try_parse_from(["tradeintel-cli", "sources"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Some(Commands::Sources)));
}

#[test]
fn parses_search_with_repeated_sources() {
    let cli = Cli::try_parse_from([
        "tradeintel-cli",
        "search",
        "--product",
        "ball bearing",
        "--hs-code",
        "8482.10",
        "--country",
        "Almanya",
        "--source",
        "google",
        "--source",
        "Trademo Intel",
        "--max",
        "5",
        "--pretty",
    ])
    .expect("expected valid cli args");

    let Some(Commands::Search(args)) = cli.command else {
        panic!("expected search command");
    };
    assert_eq!(args.sources, vec!["google", "Trademo Intel"]);
    assert_eq!(args.max, Some(5));
    assert!(args.pretty);

    let params = args.params();
    assert_eq!(params.product_name(), "ball bearing");
    assert_eq!(params.hs6(), "848210");
    assert_eq!(params.country_code(), "de");
    assert_eq!(params.language(), "en");
}

#[test]
fn search_defaults() {
    let cli = Cli::try_parse_from(["tradeintel-cli", "search", "--oem", "6204-2RS"])
        .expect("expected valid cli args");

    let Some(Commands::Search(args)) = cli.command else {
        panic!("expected search command");
    };
    assert!(args.sources.is_empty());
    assert_eq!(args.max, None);
    assert!(!args.pretty);
    assert!(!args.params().is_blank());
}

#[test]
fn search_rejects_non_numeric_max() {
    let result = Cli::try_parse_from(["tradeintel-cli", "search", "--product", "x", "--max", "ten"]);
    assert!(result.is_err());
}
