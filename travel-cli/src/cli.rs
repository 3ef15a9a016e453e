use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use inquire::{Confirm, Password, Text};
use tracing::debug;
use travel_core::{
    AuthProvider, CitiesProvider, CitiesState, CityId, Config, HttpCitiesApi, Navigation,
    TripForm, UrlLocation,
    api::api_from_config,
    form::{format_trip_date, parse_trip_date},
    geocode::geocoder_from_config,
};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "travel", version, about = "Travel log CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure the trips backend and geocoding endpoints.
    Configure,

    /// Browse and manage saved trips.
    Cities {
        #[command(subcommand)]
        action: CitiesCommand,
    },

    /// Add a trip for a map pin.
    Add {
        /// Address carrying the pin, e.g. "?lat=48.8&lng=2.3" or a full map URL.
        address: String,

        /// City name; defaults to the reverse-geocoded one.
        #[arg(long)]
        name: Option<String>,

        /// Visit date as dd/mm/yyyy; defaults to today.
        #[arg(long)]
        date: Option<String>,

        #[arg(long)]
        notes: Option<String>,

        /// Skip prompts and confirmation.
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Sign in with the demo account.
    Login {
        #[arg(long)]
        email: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum CitiesCommand {
    /// List all saved trips.
    List,
    /// List visited countries.
    Countries,
    /// Show one trip.
    Show { id: String },
    /// Delete one trip.
    Delete {
        id: String,

        #[arg(long, short = 'y')]
        yes: bool,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Cities { action } => {
                let config = Config::load()?;
                cities(&config, action).await
            }
            Command::Add { address, name, date, notes, yes } => {
                let config = Config::load()?;
                add(&config, &address, AddFields { name, date, notes }, yes).await
            }
            Command::Login { email } => login(email),
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    config.backend_url = Text::new("Trips backend URL:")
        .with_default(&config.backend_url)
        .prompt()
        .context("Failed to read backend URL")?;

    config.geocoding_url = Text::new("Reverse geocoding URL:")
        .with_default(&config.geocoding_url)
        .prompt()
        .context("Failed to read geocoding URL")?;

    let current_timeout =
        config.request_timeout_secs.map(|secs| secs.to_string()).unwrap_or_default();
    let timeout = Text::new("Request timeout in seconds (empty for none):")
        .with_initial_value(&current_timeout)
        .prompt()
        .context("Failed to read request timeout")?;
    config.request_timeout_secs = match timeout.trim() {
        "" => None,
        secs => Some(secs.parse().with_context(|| format!("Invalid timeout '{secs}'"))?),
    };

    let path = config.save()?;
    println!("Configuration saved to {}", path.display());
    Ok(())
}

async fn cities(config: &Config, action: CitiesCommand) -> anyhow::Result<()> {
    let api = api_from_config(config)?;

    match action {
        CitiesCommand::List => show_collection(api, render::city_list).await?,
        CitiesCommand::Countries => show_collection(api, render::country_list).await?,
        CitiesCommand::Show { id } => {
            let provider = CitiesProvider::new(api);
            let city = provider.get_city(&CityId::new(id)).await?;
            println!("{}", render::city_detail(&city));
        }
        CitiesCommand::Delete { id, yes } => {
            let id = CityId::new(id);
            if !yes
                && !Confirm::new(&format!("Delete trip {id}?"))
                    .with_default(false)
                    .prompt()
                    .context("Failed to read confirmation")?
            {
                println!("Nothing deleted.");
                return Ok(());
            }

            let provider = CitiesProvider::start(api).await;
            provider.delete_city(&id).await?;
            println!("Deleted trip {id}.\n");
            println!("{}", render::collection_view(&provider.state()));
        }
    }

    Ok(())
}

async fn show_collection(
    api: HttpCitiesApi,
    view: fn(&CitiesState) -> String,
) -> anyhow::Result<()> {
    let state = CitiesProvider::start(api).await.state();
    if let Some(error) = state.error {
        bail!(error);
    }
    println!("{}", view(&state));
    Ok(())
}

struct AddFields {
    name: Option<String>,
    date: Option<String>,
    notes: Option<String>,
}

async fn add(
    config: &Config,
    address: &str,
    fields: AddFields,
    yes: bool,
) -> anyhow::Result<()> {
    let mut form = TripForm::new(UrlLocation::from_address(address));
    let geocoder = geocoder_from_config(config)?;
    form.lookup(&geocoder).await;

    if let Some(message) = form.message() {
        bail!("{message}");
    }

    println!("{} {}, {}", form.flag().unwrap_or_default(), form.city_name(), form.country());

    match fields.name {
        Some(name) => form.set_city_name(name),
        None if !yes => {
            let name = Text::new("City name:")
                .with_default(form.city_name())
                .prompt()
                .context("Failed to read city name")?;
            form.set_city_name(name);
        }
        None => {}
    }

    let date = match fields.date {
        Some(date) => Some(date),
        None if !yes => {
            let today = form.date().map(|d| format_trip_date(&d)).unwrap_or_default();
            let prompt = format!("When did you go to {}? (dd/mm/yyyy)", form.city_name());
            Some(
                Text::new(&prompt)
                    .with_default(&today)
                    .prompt()
                    .context("Failed to read trip date")?,
            )
        }
        None => None,
    };
    if let Some(date) = date {
        let parsed = match date.trim() {
            "" => None,
            text => Some(
                parse_trip_date(text)
                    .with_context(|| format!("Invalid date '{text}', expected dd/mm/yyyy"))?,
            ),
        };
        form.set_date(parsed);
    }

    match fields.notes {
        Some(notes) => form.set_notes(notes),
        None if !yes => {
            let prompt = format!("Notes about your trip to {}:", form.city_name());
            let notes = Text::new(&prompt).prompt().context("Failed to read notes")?;
            form.set_notes(notes);
        }
        None => {}
    }

    if !yes
        && !Confirm::new("Add this trip?")
            .with_default(true)
            .prompt()
            .context("Failed to read confirmation")?
    {
        return follow(form.back(), None);
    }

    let provider = CitiesProvider::start(api_from_config(config)?).await;
    let Some(submitted) = form.submit(&provider).await else {
        println!("A city name and a date are required; nothing was saved.");
        return Ok(());
    };

    follow(submitted.navigation, Some(&provider.state()))?;
    match submitted.error {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

fn follow(navigation: Navigation, state: Option<&CitiesState>) -> anyhow::Result<()> {
    debug!(?navigation, "navigating");
    match (navigation, state) {
        (Navigation::To(_), Some(state)) => println!("{}", render::collection_view(state)),
        (Navigation::To(route), None) => println!("See {route}"),
        (Navigation::Back, _) => println!("Going back without saving."),
    }
    Ok(())
}

fn login(email: Option<String>) -> anyhow::Result<()> {
    let email = match email {
        Some(email) => email,
        None => Text::new("Email:").prompt().context("Failed to read email")?,
    };
    let password = Password::new("Password:")
        .without_confirmation()
        .prompt()
        .context("Failed to read password")?;

    let auth = AuthProvider::new();
    if !auth.login(&email, &password) {
        bail!("Wrong email or password");
    }

    if let Some(user) = auth.state().user {
        println!("{}", render::welcome(&user));
    }
    Ok(())
}
