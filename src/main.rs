use anyhow::{Context, Result, bail};
use clap::{Arg, ArgAction, ArgMatches, Command};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use organograma::app::{App, AppState};
use organograma::config::{self, Config};
use organograma::edit::EditForm;
use organograma::error::{CommitError, ValidationError};
use organograma::render::{self, PhotoView};
use organograma::status::StatusKind;
use organograma::store::HttpStore;
use organograma::{export, logging, model, positions};

fn cli() -> Command {
    Command::new("organograma")
        .version(env!("CARGO_PKG_VERSION"))
        .about("View, edit and export the organizational chart")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Config file")
                .default_value(config::DEFAULT_CONFIG_PATH)
                .global(true),
        )
        .arg(
            Arg::new("url")
                .long("url")
                .value_name("URL")
                .help("Chart service URL (overrides config and ORGANOGRAMA_URL)")
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("More log output (-v info, -vv debug)")
                .global(true),
        )
        .subcommand(
            Command::new("show")
                .about("Load and print the chart")
                .arg(departments_arg()),
        )
        .subcommand(Command::new("members").about("List the member roster"))
        .subcommand(Command::new("leaders").about("List every filled position"))
        .subcommand(Command::new("positions").about("List known position ids"))
        .subcommand(Command::new("sync").about("Reload members and chart from the service"))
        .subcommand(
            Command::new("edit")
                .about("Edit one position and commit it")
                .arg(Arg::new("position").required(true).value_name("POSITION"))
                .arg(Arg::new("name").long("name").value_name("NAME"))
                .arg(Arg::new("number").long("number").value_name("NUMBER").help("Member number"))
                .arg(
                    Arg::new("member")
                        .long("member")
                        .value_name("NUMBER")
                        .help("Take name and number from the roster")
                        .conflicts_with_all(["name", "number"]),
                )
                .arg(Arg::new("photo").long("photo").value_name("FILE").value_parser(clap::value_parser!(PathBuf)))
                .arg(
                    Arg::new("yes")
                        .long("yes")
                        .short('y')
                        .action(ArgAction::SetTrue)
                        .help("Commit without asking"),
                ),
        )
        .subcommand(
            Command::new("export")
                .about("Export the chart as a multi-page A4 PDF")
                .arg(
                    Arg::new("out")
                        .long("out")
                        .value_name("DIR")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(departments_arg()),
        )
        .subcommand(Command::new("init-config").about("Write a config file with default values"))
}

fn departments_arg() -> Arg {
    Arg::new("departments")
        .long("departments")
        .action(ArgAction::SetTrue)
        .help("Include department roles")
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    logging::init_logging(matches.get_count("verbose"))?;

    let config_path = PathBuf::from(
        matches
            .get_one::<String>("config")
            .map(String::as_str)
            .unwrap_or(config::DEFAULT_CONFIG_PATH),
    );

    if let Some(("init-config", _)) = matches.subcommand() {
        if config_path.exists() {
            bail!("{} already exists", config_path.display());
        }
        config::save_config(&Config::default(), &config_path)?;
        println!("Wrote {}", config_path.display());
        return Ok(());
    }

    let config = config::apply_overrides(
        config::load_config(&config_path)?,
        std::env::var(config::URL_ENV).ok(),
        matches.get_one::<String>("url").map(String::as_str),
    );
    tracing::info!(url = %config.base_url, mode = %config.write_mode, "using chart service");

    let store = HttpStore::new(&config).context("Failed to create chart service client")?;
    let app = App::new(Arc::new(store), &config);
    let mut state = AppState::new(&config);

    let result = match matches.subcommand() {
        Some(("show", sub)) => {
            state.set_departments(sub.get_flag("departments"));
            app.sync(&mut state).await;
            print!("{}", render::to_text(&state.view));
            Ok(())
        }
        Some(("members", _)) => {
            app.load_members(&mut state).await;
            for m in model::selectable(&state.members) {
                println!("{:>6}  {}", m.number, m.name);
            }
            Ok(())
        }
        Some(("leaders", _)) => {
            app.load_chart(&mut state).await;
            print_leaders(&state);
            Ok(())
        }
        Some(("positions", _)) => {
            print_positions();
            Ok(())
        }
        Some(("sync", _)) => {
            app.sync(&mut state).await;
            println!("{} membros, {} cargos", state.members.len(), state.chart.len());
            Ok(())
        }
        Some(("edit", sub)) => run_edit(&app, &mut state, sub).await,
        Some(("export", sub)) => {
            state.set_departments(sub.get_flag("departments"));
            app.load_chart(&mut state).await;
            let mut export_config = config.export.clone();
            if let Some(out) = sub.get_one::<PathBuf>("out") {
                export_config.output_dir = out.clone();
            }
            let path = export::export_chart(&state.view, &export_config)?;
            state.status.show("Organograma exportado com sucesso!", StatusKind::Success);
            println!("{}", path.display());
            Ok(())
        }
        _ => unreachable!("subcommand_required"),
    };

    if let Some(banner) = state.status.visible() {
        eprintln!("[{}] {}", banner.kind, banner.message);
    }
    result
}

// *************** Edit flow ***************

async fn run_edit(app: &App, state: &mut AppState, args: &ArgMatches) -> Result<()> {
    let position_id = args.get_one::<String>("position").map(String::as_str).unwrap_or_default();
    let interactive = std::io::stdin().is_terminal() && !args.get_flag("yes");

    app.sync(state).await;

    let chart = state.chart.clone();
    let members = state.members.clone();
    let form = state.session.open(position_id, &chart)?;
    println!("Editar {}", positions::title_of(position_id));

    if let Some(number) = args.get_one::<String>("member") {
        form.select_member(&members, number)?;
    }
    if let Some(name) = args.get_one::<String>("name") {
        form.name = name.clone();
    }
    if let Some(number) = args.get_one::<String>("number") {
        form.member_number = number.clone();
    }
    let fields_given = ["member", "name", "number"]
        .iter()
        .any(|k| args.get_one::<String>(k).is_some());
    if interactive && !fields_given {
        prompt_fields(form, &members)?;
    }

    match args.get_one::<PathBuf>("photo") {
        Some(path) => {
            if let Err(e) = form.stage_photo(path, app.max_photo_bytes()) {
                // Same as a rejected file pick: the form stays as it was.
                eprintln!("⚠ {e}");
                if !interactive {
                    state.session.close();
                    return Err(e.into());
                }
                prompt_photo(form, &chart, app.max_photo_bytes())?;
            }
        }
        None if interactive => prompt_photo(form, &chart, app.max_photo_bytes())?,
        None => {}
    }

    print_form(form);
    if interactive {
        let save = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("Guardar?")
            .default(true)
            .interact()?;
        if !save {
            state.session.close();
            println!("Edição cancelada");
            return Ok(());
        }
    }

    match app.commit_edit(state).await {
        Ok(()) => {
            if let Some(card) = state.view.card(position_id) {
                println!("{}: {} (Nº {})", card.title, card.name, card.member_number);
            }
            Ok(())
        }
        Err(CommitError::Invalid(ValidationError::MissingName)) => {
            eprintln!("⚠ {}", ValidationError::MissingName);
            state.session.close();
            bail!("edit not saved")
        }
        Err(e) => {
            state.session.close();
            Err(e.into())
        }
    }
}

fn prompt_fields(form: &mut EditForm, members: &[model::Member]) -> Result<()> {
    let theme = ColorfulTheme::default();
    let roster: Vec<&model::Member> = model::selectable(members).collect();
    let mut items: Vec<String> = roster.iter().map(|m| format!("{} ({})", m.name, m.number)).collect();
    items.push("Outro nome...".to_string());

    let current = roster.iter().position(|m| m.name == form.name).unwrap_or(items.len() - 1);
    let choice = Select::with_theme(&theme)
        .with_prompt("Nome")
        .items(&items)
        .default(current)
        .interact()?;

    if let Some(member) = roster.get(choice) {
        form.name = member.name.clone();
        form.member_number = member.number.clone();
    } else {
        form.name = Input::with_theme(&theme)
            .with_prompt("Nome completo")
            .with_initial_text(form.name.clone())
            .allow_empty(true)
            .interact_text()?;
        form.member_number = Input::with_theme(&theme)
            .with_prompt("Número de membro")
            .with_initial_text(form.member_number.clone())
            .allow_empty(true)
            .interact_text()?;
    }
    Ok(())
}

/// Asks for a photo path until one is accepted or the answer is empty.
fn prompt_photo(form: &mut EditForm, chart: &model::Chart, max_bytes: u64) -> Result<()> {
    loop {
        let answer: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Foto (caminho, vazio para manter)")
            .allow_empty(true)
            .interact_text()?;
        if answer.trim().is_empty() {
            form.clear_photo(chart);
            return Ok(());
        }
        match form.stage_photo(Path::new(answer.trim()), max_bytes) {
            Ok(()) => return Ok(()),
            Err(e) => eprintln!("⚠ {e}"),
        }
    }
}

// *************** Output ***************

fn print_form(form: &EditForm) {
    let photo = match (&form.staged_photo, &form.preview) {
        (Some(staged), _) => format!("nova: {}", staged.file_name),
        (None, PhotoView::Image(_)) => "atual".to_string(),
        (None, PhotoView::Placeholder) => "sem foto".to_string(),
    };
    println!("  Nome:   {}", form.name);
    println!("  Número: {}", form.member_number);
    println!("  Foto:   {}", photo);
}

fn print_leaders(state: &AppState) {
    let leaders = render::leaders(&state.chart);
    if leaders.is_empty() {
        println!("Nenhum cargo preenchido no organograma");
        return;
    }
    for l in leaders {
        println!("{:<32} {:<28} Nº: {}", l.title, l.name, l.member_number);
    }
}

fn print_positions() {
    for section in positions::SECTIONS.iter().chain(positions::DEPARTMENTS.iter()) {
        println!("{}", section.title);
        for p in section.positions {
            println!("  {:<28} {}", p.id, p.title);
        }
    }
}
