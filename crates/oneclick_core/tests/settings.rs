use oneclick_core::{update, AppState, BackendEndpoints, Effect, Msg, Settings, Theme};

fn saved(effects: &[Effect]) -> Vec<&Settings> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::SaveSettings(settings) => Some(settings),
            _ => None,
        })
        .collect()
}

#[test]
fn restore_does_not_save() {
    let settings = Settings {
        username: Some("ana".to_string()),
        theme: Theme::Dark,
        backend: BackendEndpoints::parse("http://10.0.0.5:8000").unwrap(),
    };
    let (mut state, effects) = update(AppState::new(), Msg::RestoreSettings(settings.clone()));

    assert!(effects.is_empty());
    assert_eq!(state.settings(), &settings);
    let view = state.view();
    assert_eq!(view.username.as_deref(), Some("ana"));
    assert_eq!(view.theme, Theme::Dark);
    assert_eq!(view.backend_url, "http://10.0.0.5:8000/");
    assert!(state.consume_dirty());
}

#[test]
fn changes_save_once_and_repeats_do_not() {
    let (state, effects) = update(AppState::new(), Msg::ThemeChanged(Theme::Dark));
    assert_eq!(saved(&effects).len(), 1);
    assert_eq!(saved(&effects)[0].theme, Theme::Dark);

    let (state, effects) = update(state, Msg::ThemeChanged(Theme::Dark));
    assert!(effects.is_empty());

    let (state, effects) = update(state, Msg::UsernameChanged("  ana  ".to_string()));
    assert_eq!(saved(&effects)[0].username.as_deref(), Some("ana"));

    let (state, effects) = update(state, Msg::UsernameChanged("ana".to_string()));
    assert!(effects.is_empty());

    let (state, effects) = update(state, Msg::UsernameCleared);
    assert_eq!(saved(&effects)[0].username, None);

    let (_state, effects) = update(state, Msg::UsernameCleared);
    assert!(effects.is_empty());
}

#[test]
fn blank_username_clears_it() {
    let (state, _) = update(AppState::new(), Msg::UsernameChanged("ana".to_string()));
    let (state, effects) = update(state, Msg::UsernameChanged("   ".to_string()));

    assert_eq!(saved(&effects).len(), 1);
    assert_eq!(state.settings().username, None);
}

#[test]
fn themes_display_as_lowercase_names() {
    assert_eq!(Theme::Dark.to_string(), "dark");
    assert_eq!(Theme::Light.as_str(), "light");
}
