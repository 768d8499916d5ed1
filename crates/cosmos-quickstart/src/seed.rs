//! The sample social graph and the Gremlin statements that write and read it.
//!
//! Every write is an upsert keyed on the vertex id, so seeding an already
//! seeded graph leaves it unchanged.

use cosmos_graph::{statement, Statement};

pub const PERSON_LABEL: &str = "person";
pub const KNOWS_LABEL: &str = "knows";

/// Remove every vertex (and with them every edge).
pub const DROP_ALL: &str = "g.V().drop()";

/// Add a person unless a vertex with that id already exists.
///
/// `pkName` names the container's partition key property; each person is
/// its own partition, keyed by id.
pub const UPSERT_PERSON: &str = "g.V(pid).fold().coalesce(unfold(), \
    addV(vlabel).property('id', pid).property(pkName, pid)\
    .property('firstName', firstName).property('lastName', lastName)\
    .property('age', age))";

/// Add an edge unless the same labelled edge between the two vertices exists.
pub const UPSERT_EDGE: &str = "g.V(src).coalesce(\
    outE(rel).where(inV().hasId(dst)), \
    addE(rel).to(g.V(dst)))";

/// Vertices reachable from one person over one edge label.
pub const OUT_NEIGHBOURS: &str = "g.V(pid).out(rel)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Person {
    pub id: &'static str,
    pub first_name: &'static str,
    pub last_name: &'static str,
    pub age: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Knows {
    pub from: &'static str,
    pub to: &'static str,
}

pub const THOMAS: Person = Person {
    id: "thomas.1",
    first_name: "Thomas",
    last_name: "Andersen",
    age: 44,
};

pub const PEOPLE: [Person; 3] = [
    THOMAS,
    Person {
        id: "robin.1",
        first_name: "Robin",
        last_name: "Smith",
        age: 42,
    },
    Person {
        id: "paul.1",
        first_name: "Paul",
        last_name: "Smith",
        age: 26,
    },
];

/// Insertion order here is the order the traversal reports them in.
pub const FRIENDSHIPS: [Knows; 2] = [
    Knows {
        from: "thomas.1",
        to: "robin.1",
    },
    Knows {
        from: "thomas.1",
        to: "paul.1",
    },
];

pub fn drop_all() -> Statement {
    statement(DROP_ALL)
}

/// `partition_key` is the property name, e.g. `pk` for a `/pk` container.
pub fn upsert_person(person: &Person, partition_key: &str) -> Statement {
    statement(UPSERT_PERSON)
        .bind("vlabel", PERSON_LABEL)
        .bind("pid", person.id)
        .bind("pkName", partition_key)
        .bind("firstName", person.first_name)
        .bind("lastName", person.last_name)
        .bind("age", person.age)
}

pub fn upsert_knows(edge: &Knows) -> Statement {
    statement(UPSERT_EDGE)
        .bind("rel", KNOWS_LABEL)
        .bind("src", edge.from)
        .bind("dst", edge.to)
}

/// `g.V('<id>').out('knows')`
pub fn known_by(person: &Person) -> Statement {
    statement(OUT_NEIGHBOURS)
        .bind("pid", person.id)
        .bind("rel", KNOWS_LABEL)
}
