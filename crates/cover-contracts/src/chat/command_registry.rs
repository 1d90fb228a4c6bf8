#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ArgKind {
    None,
    Raw,
    Path,
    OptionalPath,
    Index,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub arg: ArgKind,
    pub usage: &'static str,
}

pub(crate) const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "title",
        arg: ArgKind::Raw,
        usage: "/title <text>",
    },
    CommandSpec {
        command: "body",
        arg: ArgKind::Raw,
        usage: "/body <text>",
    },
    CommandSpec {
        command: "body_file",
        arg: ArgKind::Path,
        usage: "/body_file <path>",
    },
    CommandSpec {
        command: "produce",
        arg: ArgKind::None,
        usage: "/produce",
    },
    CommandSpec {
        command: "refine",
        arg: ArgKind::Raw,
        usage: "/refine <edit command>",
    },
    CommandSpec {
        command: "restore",
        arg: ArgKind::Index,
        usage: "/restore <index>",
    },
    CommandSpec {
        command: "history",
        arg: ArgKind::None,
        usage: "/history",
    },
    CommandSpec {
        command: "status",
        arg: ArgKind::None,
        usage: "/status",
    },
    CommandSpec {
        command: "export",
        arg: ArgKind::OptionalPath,
        usage: "/export [path]",
    },
    CommandSpec {
        command: "reset",
        arg: ArgKind::None,
        usage: "/reset",
    },
    CommandSpec {
        command: "text_model",
        arg: ArgKind::Raw,
        usage: "/text_model <model>",
    },
    CommandSpec {
        command: "image_model",
        arg: ArgKind::Raw,
        usage: "/image_model <model>",
    },
    CommandSpec {
        command: "help",
        arg: ArgKind::None,
        usage: "/help",
    },
];

pub(crate) fn find_command(command: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|spec| spec.command == command)
}

pub fn chat_help_lines() -> Vec<&'static str> {
    COMMANDS.iter().map(|spec| spec.usage).collect()
}
