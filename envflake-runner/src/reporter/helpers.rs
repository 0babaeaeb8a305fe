// Copyright (c) The envflake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use owo_colors::Style;

#[derive(Debug, Default, Clone)]
pub(super) struct Styles {
    pub(super) is_colorized: bool,
    pub(super) count: Style,
    pub(super) heading: Style,
    pub(super) project: Style,
    pub(super) pass: Style,
    pub(super) fail: Style,
    pub(super) skip: Style,
}

impl Styles {
    pub(super) fn colorize(&mut self) {
        self.is_colorized = true;
        self.count = Style::new().bold();
        self.heading = Style::new().bold().underline();
        self.project = Style::new().blue().bold();
        self.pass = Style::new().green().bold();
        self.fail = Style::new().red().bold();
        self.skip = Style::new().yellow().bold();
    }
}
