// connexion BD + création du schéma

use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, Schema};

use crate::models::{alerte, liste, liste_item, mouvement, produit};

pub async fn establish_connection(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}

/// Crée les tables du registre si elles n'existent pas (ordre des clés étrangères)
pub async fn create_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    create_table(db, produit::Entity).await?;
    create_table(db, mouvement::Entity).await?;
    create_table(db, liste::Entity).await?;
    create_table(db, liste_item::Entity).await?;
    create_table(db, alerte::Entity).await?;
    Ok(())
}

pub(crate) async fn create_table<C, E>(db: &C, entity: E) -> Result<(), DbErr>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let backend = db.get_database_backend();
    let mut statement = Schema::new(backend).create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(backend.build(&statement)).await?;
    Ok(())
}
