//! Human-readable dumps of the navigation stacks.
//!
//! ```ignore
//! println!("{}", authority.debug_tree());
//! ```
//!
//! ```text
//! Navigation (3 entries):
//! ├── page (2)
//! │   ├── loading [Active]
//! │   └── home [Active]
//! ├── sheet (empty)
//! └── modal (1)
//!     └── settings [Active] *
//! ```
//!
//! The interactive entry is marked with `*`.

use std::fmt::{self, Write};

use crate::container::NavigationContainer;
use crate::screen::{ContainerKind, EntryId};

/// Style options for stack tree visualization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TreeStyle {
    /// ASCII characters for tree branches.
    Ascii,
    /// Unicode box-drawing characters.
    #[default]
    Unicode,
    /// Compact dash-prefixed lines.
    Compact,
}

/// Configuration for stack tree output.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    /// The style of tree visualization.
    pub style: TreeStyle,
    /// Whether to show entry IDs.
    pub show_ids: bool,
    /// Whether to show lifecycle phases.
    pub show_phases: bool,
    /// Whether to list containers that hold no entries.
    pub show_empty: bool,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_ids: false,
            show_phases: true,
            show_empty: true,
        }
    }
}

impl TreeFormatOptions {
    /// Everything, including entry IDs.
    pub fn detailed() -> Self {
        Self {
            show_ids: true,
            ..Default::default()
        }
    }

    /// Screen names only, non-empty containers only.
    pub fn minimal() -> Self {
        Self {
            show_ids: false,
            show_phases: false,
            show_empty: false,
            ..Default::default()
        }
    }
}

struct Glyphs {
    branch: &'static str,
    tee: &'static str,
    corner: &'static str,
    blank: &'static str,
}

impl TreeStyle {
    fn glyphs(self) -> Glyphs {
        match self {
            Self::Ascii => Glyphs {
                branch: "|   ",
                tee: "+-- ",
                corner: "`-- ",
                blank: "    ",
            },
            Self::Unicode => Glyphs {
                branch: "\u{2502}   ",
                tee: "\u{251c}\u{2500}\u{2500} ",
                corner: "\u{2514}\u{2500}\u{2500} ",
                blank: "    ",
            },
            Self::Compact => Glyphs {
                branch: "  ",
                tee: "- ",
                corner: "- ",
                blank: "  ",
            },
        }
    }
}

/// Snapshot view over a navigator's containers, printable via `Display`.
pub struct StackTreeDebug<'a> {
    containers: [&'a NavigationContainer; 3],
    interactive: Option<(ContainerKind, EntryId)>,
    options: TreeFormatOptions,
}

impl<'a> StackTreeDebug<'a> {
    pub(crate) fn new(
        containers: [&'a NavigationContainer; 3],
        interactive: Option<(ContainerKind, EntryId)>,
    ) -> Self {
        Self {
            containers,
            interactive,
            options: TreeFormatOptions::default(),
        }
    }

    /// Replace the format options.
    pub fn with_options(mut self, options: TreeFormatOptions) -> Self {
        self.options = options;
        self
    }

    /// Render the tree.
    pub fn format(&self) -> String {
        let mut output = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_tree(&mut output);
        output
    }

    fn write_tree(&self, out: &mut impl Write) -> fmt::Result {
        let glyphs = self.options.style.glyphs();
        let stacks: Vec<_> = self
            .containers
            .iter()
            .map(|container| (container.kind(), container.entries()))
            .filter(|(_, entries)| self.options.show_empty || !entries.is_empty())
            .collect();
        let total: usize = self.containers.iter().map(|container| container.len()).sum();

        writeln!(out, "Navigation ({total} entries):")?;
        if stacks.is_empty() {
            return writeln!(out, "  (empty)");
        }

        for (index, (kind, entries)) in stacks.iter().enumerate() {
            let last_stack = index + 1 == stacks.len();
            let (connector, indent) = if last_stack {
                (glyphs.corner, glyphs.blank)
            } else {
                (glyphs.tee, glyphs.branch)
            };

            if entries.is_empty() {
                writeln!(out, "{connector}{kind} (empty)")?;
                continue;
            }
            writeln!(out, "{connector}{kind} ({})", entries.len())?;

            for (position, entry) in entries.iter().enumerate() {
                let leaf = if position + 1 == entries.len() {
                    glyphs.corner
                } else {
                    glyphs.tee
                };
                write!(out, "{indent}{leaf}{}", entry.screen)?;
                if self.options.show_ids {
                    write!(out, " {:?}", entry.id)?;
                }
                if self.options.show_phases {
                    write!(out, " [{}]", entry.phase)?;
                }
                if self.interactive == Some((*kind, entry.id)) {
                    write!(out, " *")?;
                }
                writeln!(out)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for StackTreeDebug<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_tree(f)
    }
}

impl fmt::Debug for StackTreeDebug<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackTreeDebug")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
