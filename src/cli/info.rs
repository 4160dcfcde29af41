//! `info`: show what the workspace looks like to the engine.

use anyhow::Result;
use clap::Args;
use console::style;

use super::utils::{open_workspace, resolve_item};
use super::GlobalArgs;
use crate::config::CliOverrides;
use crate::domain::{DeclarationId, Element, NamespaceId, ResourcePath, SelectionItem, UnitId};
use crate::services::{ResourceKind, SourceModel};
use crate::workspace::Workspace;

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// File, folder or handle to list (defaults to the whole workspace)
    #[arg(value_name = "ITEM")]
    pub item: Option<String>,
}

pub fn run(args: InfoArgs, global: &GlobalArgs) -> Result<()> {
    let (_config, workspace) = open_workspace(global, CliOverrides::default())?;
    let Some(spec) = args.item else {
        print_summary(&workspace);
        return Ok(());
    };

    let item = match resolve_item(&workspace, &spec)? {
        SelectionItem::Resource { path } => match workspace.element_for_resource(&path) {
            Some(element) => element.into(),
            None => SelectionItem::Resource { path },
        },
        item => item,
    };
    match item {
        SelectionItem::Element(Element::SourceRoot { path }) => print_root(&workspace, &path),
        SelectionItem::Element(Element::Namespace(ns)) => print_namespace(&workspace, &ns),
        SelectionItem::Element(Element::SourceFile(unit)) => print_unit(&workspace, &unit),
        SelectionItem::Element(Element::Declaration(decl)) => {
            println!("{}", SelectionItem::from(Element::Declaration(decl.clone())));
            for member in workspace.type_members(&decl) {
                print_declaration(&member.id);
            }
        }
        SelectionItem::Resource { path } => print_resource(&workspace, &path),
    }
    Ok(())
}

fn print_summary(workspace: &Workspace) {
    let name = workspace.root().file_name().and_then(|n| n.to_str()).unwrap_or("");
    println!("Workspace: {}", name);
    let roots = workspace.source_roots();
    if roots.is_empty() {
        println!("No source folders found.");
    }
    for root in &roots {
        print_root(workspace, root);
    }
    let other = workspace
        .text_files()
        .into_iter()
        .filter(|file| !roots.iter().any(|root| file.is_same_or_descendant_of(root)))
        .count();
    println!("Other text files: {}", other);
}

fn print_root(workspace: &Workspace, root: &ResourcePath) {
    let label = if workspace.is_archive(root) { "library" } else { "source" };
    println!("{} ({})", style(Element::SourceRoot { path: root.clone() }).bold(), label);
    for ns in workspace.namespaces(root) {
        let units = workspace.units(&ns).len();
        let name = if ns.is_default() { "(default)" } else { ns.name.as_str() };
        println!("  {:<40} {} unit(s)  {}", name, units, Element::Namespace(ns.clone()));
    }
}

fn print_namespace(workspace: &Workspace, ns: &NamespaceId) {
    println!("{}", style(Element::Namespace(ns.clone())).bold());
    for unit in workspace.units(ns) {
        println!("  {:<40} {}", unit.name, Element::SourceFile(unit.clone()));
    }
}

fn print_unit(workspace: &Workspace, unit: &UnitId) {
    println!("{}", style(Element::SourceFile(unit.clone())).bold());
    if !workspace.is_structure_known(unit) {
        println!("  {}", style("structure unknown (the file does not parse)").yellow());
    }
    for declaration in workspace.declarations(unit) {
        print_declaration(&declaration.id);
    }
}

fn print_declaration(id: &DeclarationId) {
    let depth = id.path.matches('.').count();
    let indent = "  ".repeat(depth + 1);
    println!("{indent}{:<10} {:<30} {}", id.kind.as_str(), id.simple_name(), Element::Declaration(id.clone()));
}

fn print_resource(workspace: &Workspace, path: &ResourcePath) {
    match workspace.resource_kind(path) {
        Some(ResourceKind::File) => println!("/{}", path),
        Some(_) => {
            println!("{}", style(format!("/{path}")).bold());
            for member in workspace.members(path) {
                let marker = if workspace.resource_kind(&member) == Some(ResourceKind::File) { "" } else { "/" };
                println!("  {}{}", member.name(), marker);
            }
        }
        None => println!("'{}' does not exist.", path),
    }
}
