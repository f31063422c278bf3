use anyhow::{bail, Context, Result};
use futures::future::join_all;
use tracing::warn;

use retos_core::api::client::{DEFAULT_PERSONAS_PER_PAGE, DEFAULT_RANKING_PER_PAGE};
use retos_core::models::NewPersona;
use retos_core::{App, AppError, Guarded, Navigation, Route};

use crate::prompt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Status,
    Register,
    Google(String),
    Login(Option<String>),
    Profile,
    Ranking { page: u32, per_page: u32 },
    Open(String),
    Logout,
    Personas { page: u32, per_page: u32 },
    Delete(Vec<i64>),
}

impl Command {
    pub fn parse(args: &[String]) -> Result<Self> {
        let Some((name, rest)) = args.split_first() else {
            return Ok(Command::Help);
        };

        let command = match name.as_str() {
            "help" | "-h" | "--help" => Command::Help,
            "status" => Command::Status,
            "register" => Command::Register,
            "google" => match rest.first() {
                Some(credential) => Command::Google(credential.clone()),
                None => bail!("google requires a credential"),
            },
            "login" => Command::Login(rest.first().cloned()),
            "profile" => Command::Profile,
            "ranking" => {
                let (page, per_page) = paging(rest, DEFAULT_RANKING_PER_PAGE)?;
                Command::Ranking { page, per_page }
            }
            "open" => match rest.first() {
                Some(path) => Command::Open(path.clone()),
                None => bail!("open requires a path"),
            },
            "logout" => Command::Logout,
            "personas" => {
                let (page, per_page) = paging(rest, DEFAULT_PERSONAS_PER_PAGE)?;
                Command::Personas { page, per_page }
            }
            "delete" => {
                if rest.is_empty() {
                    bail!("delete requires at least one id");
                }
                let ids = rest
                    .iter()
                    .map(|s| s.parse::<i64>().with_context(|| format!("Invalid id: {}", s)))
                    .collect::<Result<Vec<_>>>()?;
                Command::Delete(ids)
            }
            other => bail!("Unknown command: {}", other),
        };
        Ok(command)
    }
}

fn paging(rest: &[String], default_per_page: u32) -> Result<(u32, u32)> {
    let page = match rest.first() {
        Some(s) => s.parse().with_context(|| format!("Invalid page: {}", s))?,
        None => 1,
    };
    let per_page = match rest.get(1) {
        Some(s) => s.parse().with_context(|| format!("Invalid page size: {}", s))?,
        None => default_per_page,
    };
    if page == 0 || per_page == 0 {
        bail!("page and page size start at 1");
    }
    Ok((page, per_page))
}

/// 1-based leaderboard position of the `index`-th entry on `page`.
fn position(page: u32, per_page: u32, index: usize) -> u64 {
    u64::from(page.saturating_sub(1)) * u64::from(per_page) + index as u64 + 1
}

pub async fn run(app: &mut App, command: Command) -> Result<()> {
    match command {
        Command::Help => {}
        Command::Status => status(app),
        Command::Register => register(app).await?,
        Command::Google(credential) => {
            let result = app.sign_in_with_google(&credential).await;
            report_sign_in(app, result);
        }
        Command::Login(correo) => login(app, correo).await?,
        Command::Profile => {
            if let Some(profile) = ready(app.load_profile().await) {
                println!("{} {}", profile.nombre, profile.apellidos);
                println!("  Correo:  {}", profile.correo);
                println!("  Usuario: {}", profile.nombre_usuario);
                if let Some(rol) = profile.id_rol {
                    println!("  Rol:     {}", rol);
                }
            }
        }
        Command::Ranking { page, per_page } => {
            if let Some(entries) = ready(app.load_ranking(page, per_page).await) {
                if entries.is_empty() {
                    println!("Sin resultados.");
                }
                for (i, entry) in entries.iter().enumerate() {
                    println!(
                        "{:>4}. {:<24} {:>8.1} pts  {:>3} retos",
                        position(page, per_page, i),
                        entry.nombre_usuario,
                        entry.puntaje_total.unwrap_or(0.0),
                        entry.num_retos_resueltos.unwrap_or(0),
                    );
                }
            }
        }
        Command::Open(path) => match app.navigate(&path) {
            Navigation::Render(route) => println!("{}", describe(&route)),
            Navigation::Loading => println!("Cargando..."),
            Navigation::Redirect { target, from } => {
                println!("Inicia sesión para continuar. Redirigiendo a {} (desde {})", target, from)
            }
            Navigation::NotFound(path) => println!("Página no encontrada: {}", path),
        },
        Command::Logout => {
            let next = app.logout();
            println!("Sesión cerrada. Continúa en {}", next);
        }
        Command::Personas { page, per_page } => match app.list_personas(page, per_page).await {
            Ok(personas) => {
                for p in personas {
                    println!(
                        "{:>5}  {:<28} {:<28} {}",
                        p.id_persona,
                        p.full_name(),
                        p.correo,
                        p.role_display()
                    );
                }
            }
            Err(e) => fail(&e),
        },
        Command::Delete(ids) => {
            let app = &*app;
            let results = join_all(ids.iter().map(|&id| async move {
                (id, app.delete_persona(id).await)
            }))
            .await;
            for (id, result) in results {
                match result {
                    Ok(message) => println!("{}: {}", id, message),
                    Err(e) => eprintln!("{}: {}", id, e.user_message()),
                }
            }
        }
    }
    Ok(())
}

fn status(app: &App) {
    let session = app.status();
    match session.user_id() {
        Some(id) if session.is_authenticated() => println!("Sesión iniciada (usuario {})", id),
        _ if session.is_loading() => println!("Cargando..."),
        _ => println!("Sin sesión"),
    }
}

async fn register(app: &App) -> Result<()> {
    let form = NewPersona {
        nombre: prompt::line("Nombre", None)?,
        apellidos: prompt::line("Apellidos", None)?,
        correo: prompt::line("Correo", None)?,
        nombre_usuario: prompt::line("Nombre de usuario", None)?,
        contrasena_plana: prompt::password("Contraseña")?,
    };

    match app.register(&form).await {
        Ok(message) => println!("{}", message),
        Err(e) => fail(&e),
    }
    Ok(())
}

async fn login(app: &mut App, correo: Option<String>) -> Result<()> {
    let correo = match correo {
        Some(c) => c,
        None => prompt::line("Correo", app.config.last_correo.as_deref())?,
    };
    let contrasena = prompt::password("Contraseña")?;

    let result = app.sign_in_with_password(&correo, &contrasena).await;
    if result.is_ok() {
        app.config.last_correo = Some(correo.trim().to_string());
        if let Err(e) = app.config.save() {
            warn!(error = %e, "Failed to save config");
        }
    }
    report_sign_in(app, result);
    Ok(())
}

fn report_sign_in(app: &App, result: Result<retos_core::User, AppError>) {
    match result {
        Ok(user) => {
            println!("Sesión iniciada (usuario {})", user.id);
            if let Navigation::Render(route) = app.navigate(retos_core::guard::PROFILE_PATH) {
                println!("{}", describe(&route));
            }
        }
        Err(e) => fail(&e),
    }
}

/// Unwrap a protected view's data, printing the outcome otherwise.
fn ready<T>(outcome: Guarded<T>) -> Option<T> {
    match outcome {
        Guarded::Ready(data) => Some(data),
        Guarded::Loading => {
            println!("Cargando...");
            None
        }
        Guarded::Redirect { target, .. } => {
            eprintln!("Inicia sesión para continuar ({}).", target);
            None
        }
        Guarded::Failed(message) => {
            eprintln!("{}", message);
            None
        }
        Guarded::Discarded => None,
    }
}

fn describe(route: &Route) -> String {
    match route {
        Route::Register => "Registro: retos register | retos google <credencial> | retos login".into(),
        Route::Profile => "Perfil: retos profile".into(),
        Route::Ranking => "Ranking: retos ranking [página] [por_página]".into(),
        Route::NotFound(path) => format!("Página no encontrada: {}", path),
    }
}

fn fail(e: &AppError) {
    eprintln!("{}", e.user_message());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_defaults_paging() {
        assert_eq!(
            Command::parse(&args(&["ranking"])).unwrap(),
            Command::Ranking { page: 1, per_page: DEFAULT_RANKING_PER_PAGE }
        );
        assert_eq!(
            Command::parse(&args(&["personas", "3", "5"])).unwrap(),
            Command::Personas { page: 3, per_page: 5 }
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(Command::parse(&args(&["ranking", "0"])).is_err());
        assert!(Command::parse(&args(&["delete"])).is_err());
        assert!(Command::parse(&args(&["delete", "x"])).is_err());
        assert!(Command::parse(&args(&["google"])).is_err());
        assert!(Command::parse(&args(&["bogus"])).is_err());
    }

    #[test]
    fn test_position_on_huge_page_does_not_overflow() {
        assert_eq!(position(1, 10, 0), 1);
        assert_eq!(position(3, 10, 4), 25);
        assert_eq!(
            position(u32::MAX, 2, 0),
            u64::from(u32::MAX - 1) * 2 + 1
        );
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse(&[]).unwrap(), Command::Help);
        assert_eq!(
            Command::parse(&args(&["delete", "4", "7"])).unwrap(),
            Command::Delete(vec![4, 7])
        );
        assert_eq!(
            Command::parse(&args(&["login", "ana@example.com"])).unwrap(),
            Command::Login(Some("ana@example.com".to_string()))
        );
    }
}
