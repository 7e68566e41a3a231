//! Terminal styling utilities
//!
//! One palette for every CLI command and the daemon's progress line:
//! green/yellow/red for status, cyan for headers and technical terms.

use crossterm::style::Stylize;

/// Semantic styling on top of crossterm's `Stylize`
///
/// # Examples
///
/// ```
/// use idlesw::style::IdleswStyle;
///
/// println!("{}", "PLAYBACK DEVICES:".header());
/// println!("{}", "switched".success());
/// println!("{}", "alsa_output.pci-0000_00_1f.3.analog-stereo".technical());
/// ```
pub trait IdleswStyle: Stylize {
    /// Section headers (cyan bold)
    fn header(self) -> <<Self as Stylize>::Styled as Stylize>::Styled
    where
        Self: Sized,
        <Self as Stylize>::Styled: Stylize,
    {
        self.cyan().bold()
    }

    /// Positive states: "Running", "switched", the resolved target (green)
    fn success(self) -> <Self as Stylize>::Styled
    where
        Self: Sized,
    {
        self.green()
    }

    /// Problems: "Not running", failed switches (red)
    fn error(self) -> <Self as Stylize>::Styled
    where
        Self: Sized,
    {
        self.red()
    }

    /// Warnings and in-progress states: ambiguous target, armed countdown (yellow)
    fn warning(self) -> <Self as Stylize>::Styled
    where
        Self: Sized,
    {
        self.yellow()
    }

    /// Node names, paths, counts (cyan)
    fn technical(self) -> <Self as Stylize>::Styled
    where
        Self: Sized,
    {
        self.cyan()
    }
}

impl<T: Stylize> IdleswStyle for T {}
