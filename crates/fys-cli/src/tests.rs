use super::*;

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["fys"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
    assert!(cli.lat.is_none());
}

#[test]
fn parses_list_with_filters() {
    let cli = Cli::try_parse_from(["fys", "list", "--distance", "25", "--search", "plumber"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::List {
            distance: Some(ref d),
            search: Some(ref s),
        }) if d == "25" && s == "plumber"
    ));
}

#[test]
fn accepts_negative_coordinates_after_subcommand() {
    let cli = Cli::try_parse_from(["fys", "list", "--lat", "40.73", "--lng", "-73.96"])
        .expect("expected valid cli args");
    assert_eq!(cli.lat, Some(40.73));
    assert_eq!(cli.lng, Some(-73.96));
}

#[test]
fn latitude_requires_longitude() {
    assert!(Cli::try_parse_from(["fys", "--lat", "40.73", "list"]).is_err());
}

#[test]
fn parses_login() {
    let cli = Cli::try_parse_from([
        "fys",
        "login",
        "--email",
        "ada@example.com",
        "--password",
        "hunter2",
    ])
    .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Login { ref email, ref password })
            if email == "ada@example.com" && password == "hunter2"
    ));
}

#[test]
fn password_falls_back_to_dotenv_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let dotenv = dir.path().join(".env");
    std::fs::write(&dotenv, "FYS_PASSWORD=from-dotenv\n").expect("write .env");

    let cli = load_env_then_parse(
        Some(&dotenv),
        ["fys", "login", "--email", "ada@example.com"],
    )
    .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Login { ref password, .. }) if password == "from-dotenv"
    ));
}

#[test]
fn parses_delete_id() {
    let cli = Cli::try_parse_from(["fys", "delete", "42"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Some(Commands::Delete { id: 42 })));
}

#[test]
fn parses_edit_fields() {
    let cli = Cli::try_parse_from(["fys", "edit", "7", "--title", "Night Locksmith", "--city", "Queens"])
        .expect("expected valid cli args");
    let Some(Commands::Edit { id, fields }) = cli.command else {
        panic!("expected edit command");
    };
    assert_eq!(id, 7);
    assert_eq!(fields.title.as_deref(), Some("Night Locksmith"));
    assert_eq!(fields.city.as_deref(), Some("Queens"));
    assert!(fields.set_lat.is_none());
}

#[test]
fn edit_coordinates_come_in_pairs() {
    assert!(Cli::try_parse_from(["fys", "edit", "7", "--set-lat", "40.0"]).is_err());
}
