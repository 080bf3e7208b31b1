use std::io::Write;
use std::path::Path;
use anyhow::{anyhow, Result};
use tracing::info;
use crate::compose::sheet::{hstack, vstack};
use crate::compose::{Frame, WHITE};
use crate::io::{save, Image};
use crate::view::RetrievalView;

/// Where rendered rows end up.
pub trait DisplaySurface {
    /// Displays a row of cards.
    fn show_row(&mut self, view: &RetrievalView) -> Result<()>;

    /// Displays a message in place of results.
    fn notice(&mut self, message: &str) -> Result<()>;
}

impl<A: DisplaySurface, B: DisplaySurface> DisplaySurface for (A, B) {
    fn show_row(&mut self, view: &RetrievalView) -> Result<()> {
        self.0.show_row(view)?;
        self.1.show_row(view)
    }

    fn notice(&mut self, message: &str) -> Result<()> {
        self.0.notice(message)?;
        self.1.notice(message)
    }
}

/// Prints rows as text, one line per card.
pub struct TextSurface<W: Write> {
    out: W,
}

impl<W: Write> TextSurface<W> {
    pub fn new(out: W) -> TextSurface<W> { TextSurface { out } }

    pub fn into_inner(self) -> W { self.out }
}

impl<W: Write> DisplaySurface for TextSurface<W> {
    fn show_row(&mut self, view: &RetrievalView) -> Result<()> {
        writeln!(self.out, "== {}", view.title)?;
        for (rank, card) in view.cards.iter().enumerate() {
            let marker = match card.frame {
                Frame::Query => "query",
                Frame::Match => "match",
                Frame::Plain => "",
            };
            let position = if rank == 0 { "Q".to_string() } else { format!("#{}", rank) };
            if view.show_details {
                writeln!(self.out, "{:>3} {:<5} {}", position, marker, card.info)?;
            } else {
                writeln!(self.out, "{:>3} {}", position, marker)?;
            }
        }
        Ok(())
    }

    fn notice(&mut self, message: &str) -> Result<()> {
        writeln!(self.out, "{}", message)?;
        Ok(())
    }
}

/// Collects rows into a single contact-sheet image.
pub struct SheetSurface {
    rows: Vec<Image>,
    gap: usize,
}

impl SheetSurface {
    pub fn new(gap: usize) -> SheetSurface { SheetSurface { rows: vec![], gap } }

    pub fn rows(&self) -> usize { self.rows.len() }

    /// Stacks the collected rows top to bottom; an error if nothing was shown.
    pub fn sheet(&self) -> Result<Image> {
        if self.rows.is_empty() {
            return Err(anyhow!("No results were rendered."));
        }
        vstack(&self.rows, self.gap, WHITE)
    }

    /// Writes the contact sheet to `path` and forgets the collected rows.
    pub fn flush(&mut self, path: &Path) -> Result<()> {
        let sheet = self.sheet()?;
        save(sheet.view(), path)?;
        info!(path = %path.display(), rows = self.rows.len(), "wrote contact sheet");
        self.rows.clear();
        Ok(())
    }
}

impl DisplaySurface for SheetSurface {
    fn show_row(&mut self, view: &RetrievalView) -> Result<()> {
        let images = view.cards.iter().map(|card| card.image.clone()).collect::<Vec<_>>();
        self.rows.push(hstack(&images, self.gap, WHITE)?);
        Ok(())
    }

    fn notice(&mut self, _message: &str) -> Result<()> { Ok(()) }
}
