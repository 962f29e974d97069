//! Console commands, registered explicitly at startup.
//!
//! Each command is a [`CommandSpec`]: its name, aliases, usage and
//! description plus a plain function pointer. [`standard`] builds the table
//! the server ships with.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::ServerError;
use crate::opts::Weather;
use crate::world::{TridentWorld, World, WorldManager};

/// What a handler can reach.
pub struct CommandContext<'a> {
    pub manager: &'a WorldManager,
    /// The world commands act on unless told otherwise.
    pub world: &'a Arc<TridentWorld>,
    pub registry: &'a CommandRegistry,
}

/// Runs a command. `args` excludes the command name. The returned text is
/// shown to whoever issued the command.
pub type Handler = fn(&CommandContext<'_>, &[&str]) -> Result<String, ServerError>;

#[derive(Clone, Copy)]
pub struct CommandSpec {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    /// Usage line, e.g. `time [set <ticks>]`.
    pub help: &'static str,
    pub desc: &'static str,
    pub handler: Handler,
}

impl std::fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSpec")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .finish()
    }
}

/// Commands by name, in registration order, plus an alias table.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: IndexMap<&'static str, CommandSpec>,
    aliases: HashMap<&'static str, &'static str>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a command. Names and aliases share one namespace; a clash with
    /// anything already registered is an error and registers nothing.
    ///
    /// Lookups ignore case, so names and aliases must be lowercase.
    pub fn register(&mut self, spec: CommandSpec) -> Result<(), ServerError> {
        for key in std::iter::once(&spec.name).chain(spec.aliases) {
            let valid = !key.is_empty()
                && !key.contains(char::is_whitespace)
                && !key.bytes().any(|b| b.is_ascii_uppercase());
            if !valid {
                return Err(ServerError::invalid(format!("bad command name '{key}'")));
            }
        }
        for key in std::iter::once(&spec.name).chain(spec.aliases) {
            if self.resolve(key).is_some() {
                return Err(ServerError::DuplicateCommand(key.to_string()));
            }
        }
        if spec.aliases.contains(&spec.name) || has_duplicates(spec.aliases) {
            return Err(ServerError::DuplicateCommand(spec.name.to_string()));
        }

        for alias in spec.aliases {
            self.aliases.insert(*alias, spec.name);
        }
        self.commands.insert(spec.name, spec);
        Ok(())
    }

    fn resolve(&self, key: &str) -> Option<&CommandSpec> {
        self.commands
            .get(key)
            .or_else(|| self.aliases.get(key).and_then(|name| self.commands.get(name)))
    }

    /// Look up a command by name or alias, ignoring case.
    pub fn get(&self, key: &str) -> Option<&CommandSpec> {
        self.resolve(&key.to_ascii_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandSpec> {
        self.commands.values()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Parse and run one console line. A leading `/` is accepted.
    pub fn dispatch(
        &self,
        manager: &WorldManager,
        world: &Arc<TridentWorld>,
        line: &str,
    ) -> Result<String, ServerError> {
        let mut words = line.trim().trim_start_matches('/').split_whitespace();
        let Some(name) = words.next() else {
            return Ok(String::new());
        };
        let args: Vec<&str> = words.collect();

        let spec = self
            .get(name)
            .ok_or_else(|| ServerError::UnknownCommand(name.to_string()))?;
        let ctx = CommandContext {
            manager,
            world,
            registry: self,
        };
        tracing::debug!("Running command '{}' {:?}", spec.name, args);
        (spec.handler)(&ctx, &args)
    }
}

fn has_duplicates(items: &[&str]) -> bool {
    items
        .iter()
        .enumerate()
        .any(|(i, a)| items[i + 1..].contains(a))
}

/// The built-in console commands.
pub fn standard() -> Result<CommandRegistry, ServerError> {
    let mut registry = CommandRegistry::new();
    registry.register(CommandSpec {
        name: "help",
        aliases: &["?"],
        help: "help [command]",
        desc: "List commands, or show how to use one",
        handler: help,
    })?;
    registry.register(CommandSpec {
        name: "save",
        aliases: &["save-all"],
        help: "save",
        desc: "Write every loaded world to disk",
        handler: save,
    })?;
    registry.register(CommandSpec {
        name: "time",
        aliases: &[],
        help: "time [set <0-23999> | add <ticks>]",
        desc: "Show or change the time of day",
        handler: time,
    })?;
    registry.register(CommandSpec {
        name: "weather",
        aliases: &[],
        help: "weather [clear | rain | thunder]",
        desc: "Show or change the weather",
        handler: weather,
    })?;
    registry.register(CommandSpec {
        name: "chunks",
        aliases: &[],
        help: "chunks",
        desc: "Chunk table statistics for the current world",
        handler: chunks,
    })?;
    registry.register(CommandSpec {
        name: "worlds",
        aliases: &["ls"],
        help: "worlds",
        desc: "List loaded worlds",
        handler: worlds,
    })?;
    Ok(registry)
}

fn usage(ctx: &CommandContext<'_>, name: &str) -> ServerError {
    let help = ctx.registry.get(name).map(|c| c.help).unwrap_or(name);
    ServerError::invalid(format!("usage: {help}"))
}

fn help(ctx: &CommandContext<'_>, args: &[&str]) -> Result<String, ServerError> {
    match args {
        [] => Ok(ctx
            .registry
            .iter()
            .map(|c| format!("{:<10} {}", c.name, c.desc))
            .collect::<Vec<_>>()
            .join("\n")),
        [name] => {
            let spec = ctx
                .registry
                .get(name)
                .ok_or_else(|| ServerError::UnknownCommand(name.to_string()))?;
            let mut out = format!("{}\n  {}", spec.help, spec.desc);
            if !spec.aliases.is_empty() {
                out.push_str(&format!("\n  aliases: {}", spec.aliases.join(", ")));
            }
            Ok(out)
        }
        _ => Err(usage(ctx, "help")),
    }
}

fn save(ctx: &CommandContext<'_>, _args: &[&str]) -> Result<String, ServerError> {
    let written = ctx.manager.save_all()?;
    Ok(format!("Saved {} worlds ({} chunks written)", ctx.manager.worlds().len(), written))
}

fn time(ctx: &CommandContext<'_>, args: &[&str]) -> Result<String, ServerError> {
    let world = ctx.world;
    match args {
        [] => Ok(format!(
            "Time in '{}': {} (day {})",
            world.name(),
            world.time(),
            world.full_time() / 24_000
        )),
        ["set", value] => {
            let t: u32 = value.parse().map_err(|_| usage(ctx, "time"))?;
            world.set_time(t)?;
            Ok(format!("Set time in '{}' to {}", world.name(), t))
        }
        ["add", value] => {
            let ticks: u32 = value.parse().map_err(|_| usage(ctx, "time"))?;
            let t = world.tick(ticks);
            Ok(format!("Time in '{}' is now {}", world.name(), t))
        }
        _ => Err(usage(ctx, "time")),
    }
}

fn weather(ctx: &CommandContext<'_>, args: &[&str]) -> Result<String, ServerError> {
    let world = ctx.world;
    let target = match args {
        [] => {
            let w = world.weather();
            let sky = match (w.raining, w.thundering) {
                (_, true) => "thunder",
                (true, false) => "rain",
                (false, false) => "clear",
            };
            return Ok(format!("Weather in '{}': {}", world.name(), sky));
        }
        ["clear"] => Weather::clear(),
        ["rain"] => Weather::rain(),
        ["thunder"] => Weather::thunder(),
        _ => return Err(usage(ctx, "weather")),
    };
    if world.set_weather(target) {
        Ok(format!("Weather in '{}' set to {}", world.name(), args[0]))
    } else {
        Ok(format!("Weather change in '{}' was cancelled", world.name()))
    }
}

fn chunks(ctx: &CommandContext<'_>, _args: &[&str]) -> Result<String, ServerError> {
    let table = ctx.world.chunk_table();
    let stats = table.stats();
    Ok(format!(
        "'{}': {} loaded, {} dirty | loads {} generated {} misses {} saved {} unloaded {}",
        ctx.world.name(),
        table.chunk_count(),
        table.dirty_count(),
        stats.loads,
        stats.generations,
        stats.misses,
        stats.saved,
        stats.unloads
    ))
}

fn worlds(ctx: &CommandContext<'_>, _args: &[&str]) -> Result<String, ServerError> {
    Ok(ctx
        .manager
        .worlds()
        .iter()
        .map(|w| {
            format!(
                "{} ({:?}, time {}, {} chunks, {} players)",
                w.name(),
                w.dimension(),
                w.time(),
                w.chunk_table().chunk_count(),
                w.players().len()
            )
        })
        .collect::<Vec<_>>()
        .join("\n"))
}
