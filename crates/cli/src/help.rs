//! Help texts.

use crate::command::Operation;

/// Topics listed by a bare `help`.
pub(crate) const TOPICS: [Operation; 9] = [
    Operation::Eof,
    Operation::All,
    Operation::Count,
    Operation::Create,
    Operation::Destroy,
    Operation::Help,
    Operation::Quit,
    Operation::Show,
    Operation::Update,
];

pub(crate) fn overview() -> String {
    let header = "Documented commands (type help <topic>):";
    let names: Vec<&str> = TOPICS.iter().map(|op| op.name()).collect();
    format!("\n{header}\n{}\n{}\n", "=".repeat(header.len()), names.join("  "))
}

pub(crate) fn topic(op: Operation) -> &'static str {
    match op {
        Operation::Create => {
            "Creates a record of any kind and prints its id\n\
             [Usage]: create <className> [<key>=<value> ...]\n\
             \x20        <className>.create()\n\
             Strings are double-quoted with underscores for spaces; numbers with a dot are floats.\n"
        }
        Operation::Show => {
            "Shows an individual instance of a class\n\
             [Usage]: show <className> <objectId>\n\
             \x20        <className>.show(<objectId>)\n"
        }
        Operation::Destroy => {
            "Destroys an individual instance of a class\n\
             [Usage]: destroy <className> <objectId>\n\
             \x20        <className>.destroy(<objectId>)\n"
        }
        Operation::All => {
            "Shows all objects, or all of a class\n\
             [Usage]: all [<className>]\n\
             \x20        <className>.all()\n"
        }
        Operation::Count => {
            "Counts the instances of a class\n\
             [Usage]: count <className>\n\
             \x20        <className>.count()\n"
        }
        Operation::Update => {
            "Updates an object with new information\n\
             [Usage]: update <className> <id> <attName> <attVal>\n\
             \x20        <className>.update(<id>, <attName>, <attVal>)\n\
             \x20        <className>.update(<id>, <dictionary>)\n"
        }
        Operation::Help => "List available commands with \"help\" or detailed help with \"help cmd\".\n",
        Operation::Quit => "Exits the program with formatting\n",
        Operation::Eof => "Exits the program without formatting\n",
    }
}
