//! Query roots, joins and the alias map filled while rendering

use std::fmt;

/// Entity the query selects from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Entity {
    name: String,
    simple_name: String,
    alias: String,
}

impl Entity {
    /// Entity by fully qualified name, aliased by its lower-cased initial
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        assert!(!name.trim().is_empty(), "Entity name must not be empty");

        let simple_name = name.rsplit(['.', '$']).next().unwrap_or(&name).to_string();
        let alias = initial_alias(&simple_name, |_| true).unwrap_or_else(|| "r".to_string());
        Self {
            name,
            simple_name,
            alias,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        let alias = alias.into();
        assert!(!alias.trim().is_empty(), "Entity alias must not be empty");
        self.alias = alias;
        self
    }

    /// Fully qualified name as rendered in `FROM`
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn simple_name(&self) -> &str {
        &self.simple_name
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinType {
    Inner,
    Left,
}

impl JoinType {
    pub fn as_str(self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
        }
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Association joined from another origin
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Join {
    source: Box<Origin>,
    join_type: JoinType,
    path: String,
}

impl Join {
    pub fn new(source: impl Into<Origin>, join_type: JoinType, path: impl Into<String>) -> Self {
        let path = path.into();
        assert!(!path.trim().is_empty(), "Join path must not be empty");
        Self {
            source: Box::new(source.into()),
            join_type,
            path,
        }
    }

    pub fn source(&self) -> &Origin {
        &self.source
    }

    pub fn join_type(&self) -> JoinType {
        self.join_type
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Structural identity used to emit each join clause once
    pub(crate) fn key(&self) -> String {
        format!("{}_{}_{}", self.join_type, self.name(), self.path)
    }

    fn name(&self) -> &str {
        &self.path
    }

    /// The root entity at the end of the source chain
    pub fn root(&self) -> &Entity {
        let mut origin = self.source.as_ref();
        loop {
            match origin {
                Origin::Entity(entity) => return entity,
                Origin::Join(join) => origin = join.source.as_ref(),
            }
        }
    }
}

/// Anything an expression can be rooted at
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Origin {
    Entity(Entity),
    Join(Join),
}

impl Origin {
    /// Name an alias is derived from
    pub fn name(&self) -> &str {
        match self {
            Origin::Entity(entity) => entity.simple_name(),
            Origin::Join(join) => join.name(),
        }
    }
}

impl From<Entity> for Origin {
    fn from(entity: Entity) -> Self {
        Origin::Entity(entity)
    }
}

impl From<&Entity> for Origin {
    fn from(entity: &Entity) -> Self {
        Origin::Entity(entity.clone())
    }
}

impl From<Join> for Origin {
    fn from(join: Join) -> Self {
        Origin::Join(join)
    }
}

impl From<&Join> for Origin {
    fn from(join: &Join) -> Self {
        Origin::Join(join.clone())
    }
}

/// Lower-cased first character of `name`, if it is an identifier character accepted by `available`
fn initial_alias(name: &str, available: impl Fn(&str) -> bool) -> Option<String> {
    let initial = name.chars().next()?.to_lowercase().next()?;
    if !(initial.is_alphanumeric() || initial == '_' || initial == '$') {
        return None;
    }
    let alias = initial.to_string();
    available(&alias).then_some(alias)
}

/// Alias assignment for one render pass, in first-use order
#[derive(Debug, Default)]
pub struct RenderContext {
    aliases: Vec<(Origin, String)>,
    join_counter: usize,
    constructor: bool,
}

impl RenderContext {
    /// Context with the root entity's alias already taken
    pub fn for_root(entity: &Entity) -> Self {
        Self {
            aliases: vec![(Origin::from(entity), entity.alias().to_string())],
            join_counter: 0,
            constructor: false,
        }
    }

    /// Alias for `origin`, assigned on first use
    pub fn alias(&mut self, origin: &Origin) -> String {
        if let Some((_, alias)) = self.aliases.iter().find(|(known, _)| known == origin) {
            return alias.clone();
        }

        let alias = match origin {
            Origin::Entity(entity) => entity.alias().to_string(),
            Origin::Join(_) => {
                let aliases = &self.aliases;
                initial_alias(origin.name(), |candidate| {
                    !aliases.iter().any(|(_, taken)| taken == candidate)
                })
                .unwrap_or_else(|| {
                    let fallback = format!("join_{}", self.join_counter);
                    self.join_counter += 1;
                    fallback
                })
            }
        };

        self.aliases.push((origin.clone(), alias.clone()));
        alias
    }

    pub fn prefix_with_alias(&mut self, origin: &Origin, fragment: &str) -> String {
        format!("{}.{}", self.alias(origin), fragment)
    }

    /// Joins that received an alias, in discovery order
    pub fn joins(&self) -> Vec<Join> {
        self.aliases
            .iter()
            .filter_map(|(origin, _)| match origin {
                Origin::Join(join) => Some(join.clone()),
                Origin::Entity(_) => None,
            })
            .collect()
    }

    pub(crate) fn is_constructor_context(&self) -> bool {
        self.constructor
    }

    pub(crate) fn set_constructor_context(&mut self, constructor: bool) {
        self.constructor = constructor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_alias_from_simple_name() {
        let entity = Entity::new("com.example.Person");
        assert_eq!(entity.simple_name(), "Person");
        assert_eq!(entity.alias(), "p");
        assert_eq!(entity.name(), "com.example.Person");

        assert_eq!(Entity::new("Outer$Inner").simple_name(), "Inner");
        assert_eq!(Entity::new("com.example.Person").with_alias("person").alias(), "person");
    }

    #[test]
    fn test_join_aliases_avoid_collisions() {
        let person = Entity::new("com.example.Person");
        let mut context = RenderContext::for_root(&person);

        let pets = Origin::from(Join::new(&person, JoinType::Inner, "pets"));
        let parents = Origin::from(Join::new(&person, JoinType::Left, "parents"));
        let papers = Origin::from(Join::new(&person, JoinType::Left, "papers"));

        assert_eq!(context.alias(&pets), "join_0");
        assert_eq!(context.alias(&parents), "join_1");
        assert_eq!(context.alias(&pets), "join_0");

        let mut context = RenderContext::for_root(&person);
        let roles = Origin::from(Join::new(&person, JoinType::Inner, "roles"));
        assert_eq!(context.alias(&roles), "r");
        assert_eq!(context.alias(&papers), "join_0");
        assert_eq!(context.joins().len(), 2);
    }

    #[test]
    fn test_join_root() {
        let person = Entity::new("com.example.Person");
        let address = Join::new(&person, JoinType::Inner, "address");
        let country = Join::new(&address, JoinType::Left, "country");
        assert_eq!(country.root(), &person);
        assert_eq!(country.key(), "LEFT JOIN_country_country");
    }

    #[test]
    #[should_panic(expected = "Join path must not be empty")]
    fn test_empty_join_path_panics() {
        Join::new(Entity::new("com.example.Person"), JoinType::Inner, " ");
    }
}
