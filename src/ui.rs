use std::io::{self, Write};

use crate::catalog::RouteCatalog;

pub const PLACEHOLDER_TIME: &str = "--:--";
pub const NO_SELECTION: &str = "Selecione uma linha.";
pub const NO_DEPARTURES: &str = "Não há mais horários disponíveis hoje.";
pub const LOAD_FAILED: &str = "Erro ao carregar";

/// Everything shown to the user at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub route_name: Option<String>,
    pub next: String,
    pub following: String,
    pub countdown: String,
    /// Visible error text, `None` when the error line is hidden.
    pub error: Option<String>,
}

impl Frame {
    fn placeholder(countdown: &str) -> Self {
        Self {
            route_name: None,
            next: PLACEHOLDER_TIME.to_owned(),
            following: PLACEHOLDER_TIME.to_owned(),
            countdown: countdown.to_owned(),
            error: None,
        }
    }

    pub fn no_selection() -> Self {
        Self::placeholder(NO_SELECTION)
    }

    pub fn no_departures(route_name: &str) -> Self {
        Self {
            route_name: Some(route_name.to_owned()),
            ..Self::placeholder(NO_DEPARTURES)
        }
    }

    pub fn load_error(message: &str) -> Self {
        Self {
            error: Some(format!("ERRO: {}", message)),
            ..Self::placeholder(LOAD_FAILED)
        }
    }
}

/// Where frames end up.
pub trait Output {
    fn render(&mut self, frame: &Frame) -> io::Result<()>;

    /// Shows the routes that can be selected.
    fn list_routes(&mut self, catalog: &RouteCatalog) -> io::Result<()>;
}

pub struct TerminalOutput<W: Write> {
    out: W,
}

impl<W: Write> TerminalOutput<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Output for TerminalOutput<W> {
    fn render(&mut self, frame: &Frame) -> io::Result<()> {
        if let Some(error) = &frame.error {
            writeln!(self.out, "{}", error)?;
        }

        if let Some(name) = &frame.route_name {
            write!(self.out, "{} | ", name)?;
        }
        writeln!(
            self.out,
            "Próximo: {} | Em: {} | Depois: {}",
            frame.next, frame.countdown, frame.following
        )?;

        self.out.flush()
    }

    /// Numbered list, the numbers are accepted as route commands.
    fn list_routes(&mut self, catalog: &RouteCatalog) -> io::Result<()> {
        let heading = "Linhas";
        writeln!(self.out, "{}", heading)?;
        writeln!(self.out, "{}", "-".repeat(heading.chars().count()))?;

        for (i, route) in catalog.routes().iter().enumerate() {
            writeln!(self.out, "{}) {} [{}]", i + 1, route.name, route.id)?;
        }

        self.out.flush()
    }
}
